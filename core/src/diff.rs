//! Dirty-field diff codec: turns locally modified domain objects into partial
//! update payloads.
//!
//! # Design
//! Field selection is table-driven: `DomainObject::field_value` maps each
//! tracked wire name to its JSON value, and only names in the dirty set are
//! consulted. Non-dirty fields are omitted entirely, never sent as null or
//! stale values. JSON mode produces an object with exactly the dirty fields;
//! form mode produces `name=value` pairs where each value is the field's JSON
//! text, percent-encoded as UTF-8.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

use crate::domain::DomainObject;
use crate::error::DashkuError;

/// Characters escaped in form-encoded values. `*`, `-`, `.` and `_` stay
/// literal, matching conventional x-www-form-urlencoded output.
const FORM_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

fn dirty_value<T: DomainObject>(object: &T, field: &str) -> Result<Value, DashkuError> {
    object
        .field_value(field)
        .ok_or_else(|| DashkuError::Encoding(format!("no accessor for dirty field [{field}]")))
}

/// JSON update body containing exactly the dirty fields of `object`.
///
/// Zero dirty fields yield the empty object `{}`.
pub fn dirty_update_json<T: DomainObject>(object: &T) -> Result<String, DashkuError> {
    let mut diff = Map::new();
    for field in object.dirty().names() {
        diff.insert(field.to_string(), dirty_value(object, field)?);
    }
    Ok(Value::Object(diff).to_string())
}

/// Form-encoded update body containing exactly the dirty fields of `object`.
///
/// Each value is its JSON text form, percent-encoded. Zero dirty fields yield
/// the empty string rather than a dangling separator.
pub fn dirty_update_form<T: DomainObject>(object: &T) -> Result<String, DashkuError> {
    if object.dirty().is_empty() {
        return Ok(String::new());
    }
    let mut pairs = Vec::with_capacity(object.dirty().len());
    for field in object.dirty().names() {
        let text = dirty_value(object, field)?.to_string();
        pairs.push(format!("{field}={}", utf8_percent_encode(&text, FORM_ENCODE)));
    }
    Ok(pairs.join("&"))
}
