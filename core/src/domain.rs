//! Domain objects for the dashboard service.
//!
//! # Design
//! `Dashboard` and `Widget` mirror the server's JSON schema (wire names like
//! `_id`, `screenWidth`, `scopedCSS` are pinned with serde attributes) and
//! track field-level dirty state for partial updates. Every setter records
//! its field's wire name in the instance's `DirtySet`; the per-type
//! `field_value` table maps wire names back to JSON values, so the diff codec
//! selects fields through an explicit table rather than runtime introspection.
//! Dirty state is `#[serde(skip)]`: objects decoded from a response start
//! clean, exactly like freshly constructed ones.
//!
//! Identifiers are server-assigned. There is no setter for `id` or `user_id`;
//! they only ever arrive through deserialization.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A one-way JSON payload pushed to a dashboard's live widgets. Not a stored
/// entity; the server forwards it and keeps nothing.
pub type Transmission = Value;

/// Ordered set of wire names modified since the last load or persist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    fields: BTreeSet<&'static str>,
}

impl DirtySet {
    pub fn mark(&mut self, field: &'static str) {
        self.fields.insert(field);
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Dirty wire names in stable (lexicographic) order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().copied()
    }
}

/// Common surface of server-backed domain objects: identity, dirty tracking,
/// and the field-name → value table the diff codec selects from.
pub trait DomainObject {
    /// Server-assigned identifier; `None` until the object has been created.
    fn id(&self) -> Option<&str>;

    fn dirty(&self) -> &DirtySet;

    fn clear_dirty(&mut self);

    /// JSON value for one tracked field, by wire name. Returns `None` for
    /// names outside the type's tracked set.
    fn field_value(&self, field: &str) -> Option<Value>;
}

/// Screen width policy of a dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenWidth {
    #[default]
    Fixed,
    Fluid,
}

/// A dashboard with its ordered list of embedded widgets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "screenWidth", default)]
    screen_width: ScreenWidth,
    #[serde(default)]
    css: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    widgets: Vec<Widget>,
    #[serde(skip)]
    dirty: DirtySet,
}

impl Dashboard {
    /// Wire names of the fields that participate in dirty tracking.
    pub const TRACKED_FIELDS: [&'static str; 4] = ["screenWidth", "css", "name", "widgets"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn screen_width(&self) -> ScreenWidth {
        self.screen_width
    }

    pub fn set_screen_width(&mut self, screen_width: ScreenWidth) {
        self.screen_width = screen_width;
        self.dirty.mark("screenWidth");
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn set_css(&mut self, css: impl Into<String>) {
        self.css = css.into();
        self.dirty.mark("css");
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.dirty.mark("name");
    }

    /// Widgets in display order.
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Append a widget; order is display-significant.
    pub fn add_widget(&mut self, widget: Widget) {
        self.widgets.push(widget);
        self.dirty.mark("widgets");
    }

    /// Remove the widget with the given id, preserving the order of the rest.
    pub fn remove_widget(&mut self, widget_id: &str) -> Option<Widget> {
        let index = self.widgets.iter().position(|w| w.id() == Some(widget_id))?;
        self.dirty.mark("widgets");
        Some(self.widgets.remove(index))
    }
}

impl DomainObject for Dashboard {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn dirty(&self) -> &DirtySet {
        &self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "screenWidth" => serde_json::to_value(self.screen_width).ok(),
            "css" => Some(Value::String(self.css.clone())),
            "name" => Some(Value::String(self.name.clone())),
            "widgets" => serde_json::to_value(&self.widgets).ok(),
            _ => None,
        }
    }
}

/// A widget embedded in a dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "widgetTemplateId", default)]
    widget_template_id: String,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    script: String,
    #[serde(rename = "scriptType", default)]
    script_type: String,
    #[serde(default)]
    css: String,
    #[serde(rename = "scopedCSS", default)]
    scoped_css: String,
    #[serde(default)]
    html: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    json: String,
    #[serde(skip)]
    dirty: DirtySet,
}

impl Widget {
    /// Wire names of the fields that participate in dirty tracking.
    pub const TRACKED_FIELDS: [&'static str; 10] = [
        "widgetTemplateId",
        "height",
        "width",
        "script",
        "scriptType",
        "css",
        "scopedCSS",
        "html",
        "name",
        "json",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn widget_template_id(&self) -> &str {
        &self.widget_template_id
    }

    pub fn set_widget_template_id(&mut self, template_id: impl Into<String>) {
        self.widget_template_id = template_id.into();
        self.dirty.mark("widgetTemplateId");
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height;
        self.dirty.mark("height");
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
        self.dirty.mark("width");
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn set_script(&mut self, script: impl Into<String>) {
        self.script = script.into();
        self.dirty.mark("script");
    }

    pub fn script_type(&self) -> &str {
        &self.script_type
    }

    pub fn set_script_type(&mut self, script_type: impl Into<String>) {
        self.script_type = script_type.into();
        self.dirty.mark("scriptType");
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn set_css(&mut self, css: impl Into<String>) {
        self.css = css.into();
        self.dirty.mark("css");
    }

    pub fn scoped_css(&self) -> &str {
        &self.scoped_css
    }

    pub fn set_scoped_css(&mut self, scoped_css: impl Into<String>) {
        self.scoped_css = scoped_css.into();
        self.dirty.mark("scopedCSS");
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn set_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
        self.dirty.mark("html");
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.dirty.mark("name");
    }

    /// Opaque JSON text payload rendered inside the widget.
    pub fn json(&self) -> &str {
        &self.json
    }

    pub fn set_json(&mut self, json: impl Into<String>) {
        self.json = json.into();
        self.dirty.mark("json");
    }
}

impl DomainObject for Widget {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn dirty(&self) -> &DirtySet {
        &self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "widgetTemplateId" => Some(Value::String(self.widget_template_id.clone())),
            "height" => Some(Value::from(self.height)),
            "width" => Some(Value::from(self.width)),
            "script" => Some(Value::String(self.script.clone())),
            "scriptType" => Some(Value::String(self.script_type.clone())),
            "css" => Some(Value::String(self.css.clone())),
            "scopedCSS" => Some(Value::String(self.scoped_css.clone())),
            "html" => Some(Value::String(self.html.clone())),
            "name" => Some(Value::String(self.name.clone())),
            "json" => Some(Value::String(self.json.clone())),
            _ => None,
        }
    }
}
