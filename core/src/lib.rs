//! Client library for the Dashku dashboard service.
//!
//! # Overview
//! Dashboards and their embedded widgets are created, read, updated and
//! deleted over HTTP; arbitrary JSON "transmissions" are pushed to a
//! dashboard's live widgets. Domain objects track field-level dirty state so
//! updates send only what changed.
//!
//! # Design
//! - `DashkuApi` builds requests and parses responses as plain data,
//!   independent of any transport.
//! - `SyncDashku` blocks the calling thread per operation; `AsyncDashku`
//!   dispatches on its own single-threaded event context and returns
//!   [`Completion`] handles fulfilled exactly once.
//! - Partial updates select fields through per-type accessor tables driven by
//!   each object's dirty set.
//! - Failures are typed (`DashkuError`) and always surfaced to the immediate
//!   caller; nothing retries automatically.

pub mod api;
pub mod asynch;
pub mod completion;
pub mod config;
pub mod diff;
pub mod domain;
pub mod error;
pub mod http;
pub mod registry;
pub mod sync;

pub use api::DashkuApi;
pub use asynch::{AsyncDashku, RequestState};
pub use completion::Completion;
pub use config::{default_timeout, ClientConfig, DEFAULT_TIMEOUT, TIMEOUT_ENV_VAR};
pub use diff::{dirty_update_form, dirty_update_json};
pub use domain::{Dashboard, DirtySet, DomainObject, ScreenWidth, Transmission, Widget};
pub use error::DashkuError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use registry::ClientRegistry;
pub use sync::SyncDashku;
