//! In-memory stand-in for the remote dashboard service.
//!
//! Every route requires an `apiKey` query parameter; dashboards are scoped to
//! the key's owning user. The server assigns ids and timestamps, applies
//! partial updates field by field, and records transmissions so tests can
//! inspect what arrived. `Mirror` exposes the persisted state for
//! verification without going through HTTP.
//!
//! DTOs here are defined independently of the `dashku-core` crate on purpose:
//! integration tests catch any schema drift between the two.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "screenWidth")]
    pub screen_width: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub widgets: Vec<Widget>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Widget {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "widgetTemplateId", default)]
    pub widget_template_id: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub script: String,
    #[serde(rename = "scriptType", default)]
    pub script_type: String,
    #[serde(default)]
    pub css: String,
    #[serde(rename = "scopedCSS", default)]
    pub scoped_css: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub json: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Incoming dashboard payload for create.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DashboardSpec {
    #[serde(rename = "screenWidth")]
    pub screen_width: Option<String>,
    pub css: String,
    pub name: String,
    pub widgets: Vec<WidgetSpec>,
}

/// Incoming widget payload for create, or one entry of a widgets patch.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WidgetSpec {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(rename = "widgetTemplateId")]
    pub widget_template_id: String,
    pub height: u32,
    pub width: u32,
    pub script: String,
    #[serde(rename = "scriptType")]
    pub script_type: String,
    pub css: String,
    #[serde(rename = "scopedCSS")]
    pub scoped_css: String,
    pub html: String,
    pub name: String,
    pub json: String,
}

/// Partial dashboard update; only present fields are applied.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DashboardPatch {
    pub name: Option<String>,
    pub css: Option<String>,
    #[serde(rename = "screenWidth")]
    pub screen_width: Option<String>,
    pub widgets: Option<Vec<WidgetSpec>>,
}

/// Partial widget update; only present fields are applied.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WidgetPatch {
    #[serde(rename = "widgetTemplateId")]
    pub widget_template_id: Option<String>,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub script: Option<String>,
    #[serde(rename = "scriptType")]
    pub script_type: Option<String>,
    pub css: Option<String>,
    #[serde(rename = "scopedCSS")]
    pub scoped_css: Option<String>,
    pub html: Option<String>,
    pub name: Option<String>,
    pub json: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyParam {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

#[derive(Default)]
pub struct Store {
    api_keys: HashMap<String, String>,
    dashboards: HashMap<String, Dashboard>,
    transmissions: HashMap<String, Vec<Value>>,
}

pub type Db = Arc<RwLock<Store>>;

/// Test-only view of the server's persisted state, shared with the router.
///
/// `flush` clears dashboards and recorded transmissions between test cases;
/// api keys survive so clients stay valid.
#[derive(Clone)]
pub struct Mirror {
    db: Db,
}

impl Mirror {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn flush(&self) {
        let mut store = self.db.write();
        store.dashboards.clear();
        store.transmissions.clear();
    }

    pub fn get_dashboards(&self) -> Vec<Dashboard> {
        let store = self.db.read();
        let mut dashboards: Vec<Dashboard> = store.dashboards.values().cloned().collect();
        dashboards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        dashboards
    }

    pub fn get_dashboard(&self, id: &str) -> Option<Dashboard> {
        self.db.read().dashboards.get(id).cloned()
    }

    /// Transmissions recorded for one dashboard, in arrival order.
    pub fn transmissions(&self, dashboard_id: &str) -> Vec<Value> {
        self.db
            .read()
            .transmissions
            .get(dashboard_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Router plus mirror over a store seeded with `(api key, user id)` pairs.
pub fn seeded(api_keys: &[(&str, &str)]) -> (Router, Mirror) {
    let mut store = Store::default();
    for (key, user_id) in api_keys {
        store.api_keys.insert(key.to_string(), user_id.to_string());
    }
    let db: Db = Arc::new(RwLock::new(store));
    (app(db.clone()), Mirror::new(db))
}

pub fn app(db: Db) -> Router {
    Router::new()
        .route("/dashboards", get(list_dashboards).post(create_dashboard))
        .route(
            "/dashboards/{id}",
            get(get_dashboard).put(update_dashboard).delete(delete_dashboard),
        )
        .route("/dashboards/{id}/transmissions", post(create_transmission))
        .route("/dashboards/{id}/widgets", post(create_widget))
        .route(
            "/dashboards/{id}/widgets/{widget_id}",
            put(update_widget).delete(delete_widget),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn authenticate(store: &Store, auth: &ApiKeyParam) -> Result<String, StatusCode> {
    auth.api_key
        .as_deref()
        .and_then(|key| store.api_keys.get(key))
        .cloned()
        .ok_or(StatusCode::UNAUTHORIZED)
}

fn widget_from_spec(
    spec: WidgetSpec,
    user_id: &str,
    now: DateTime<Utc>,
    existing: &[Widget],
) -> Widget {
    let prior = spec
        .id
        .as_deref()
        .and_then(|id| existing.iter().find(|w| w.id == id));
    Widget {
        id: prior.map(|w| w.id.clone()).unwrap_or_else(new_id),
        user_id: user_id.to_string(),
        widget_template_id: spec.widget_template_id,
        height: spec.height,
        width: spec.width,
        script: spec.script,
        script_type: spec.script_type,
        css: spec.css,
        scoped_css: spec.scoped_css,
        html: spec.html,
        name: spec.name,
        json: spec.json,
        created_at: prior.map(|w| w.created_at).unwrap_or(now),
        updated_at: now,
    }
}

async fn list_dashboards(
    State(db): State<Db>,
    Query(auth): Query<ApiKeyParam>,
) -> Result<Json<Vec<Dashboard>>, StatusCode> {
    let store = db.read();
    let user_id = authenticate(&store, &auth)?;
    let mut dashboards: Vec<Dashboard> = store
        .dashboards
        .values()
        .filter(|d| d.user_id == user_id)
        .cloned()
        .collect();
    dashboards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(dashboards))
}

async fn get_dashboard(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(auth): Query<ApiKeyParam>,
) -> Result<Json<Dashboard>, StatusCode> {
    let store = db.read();
    let user_id = authenticate(&store, &auth)?;
    store
        .dashboards
        .get(&id)
        .filter(|d| d.user_id == user_id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_dashboard(
    State(db): State<Db>,
    Query(auth): Query<ApiKeyParam>,
    Json(spec): Json<DashboardSpec>,
) -> Result<(StatusCode, Json<Dashboard>), StatusCode> {
    let mut store = db.write();
    let user_id = authenticate(&store, &auth)?;
    let now = Utc::now();
    let widgets = spec
        .widgets
        .into_iter()
        .map(|w| widget_from_spec(w, &user_id, now, &[]))
        .collect();
    let dashboard = Dashboard {
        id: new_id(),
        user_id,
        screen_width: spec.screen_width.unwrap_or_else(|| "fixed".to_string()),
        css: spec.css,
        name: spec.name,
        widgets,
        created_at: now,
        updated_at: now,
    };
    store
        .dashboards
        .insert(dashboard.id.clone(), dashboard.clone());
    Ok((StatusCode::CREATED, Json(dashboard)))
}

async fn update_dashboard(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(auth): Query<ApiKeyParam>,
    Json(patch): Json<DashboardPatch>,
) -> Result<Json<Dashboard>, StatusCode> {
    let mut store = db.write();
    let user_id = authenticate(&store, &auth)?;
    let now = Utc::now();
    let dashboard = store
        .dashboards
        .get_mut(&id)
        .filter(|d| d.user_id == user_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = patch.name {
        dashboard.name = name;
    }
    if let Some(css) = patch.css {
        dashboard.css = css;
    }
    if let Some(screen_width) = patch.screen_width {
        dashboard.screen_width = screen_width;
    }
    if let Some(specs) = patch.widgets {
        let current = std::mem::take(&mut dashboard.widgets);
        dashboard.widgets = specs
            .into_iter()
            .map(|w| widget_from_spec(w, &user_id, now, &current))
            .collect();
    }
    dashboard.updated_at = now;
    Ok(Json(dashboard.clone()))
}

async fn delete_dashboard(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(auth): Query<ApiKeyParam>,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write();
    let user_id = authenticate(&store, &auth)?;
    let owned = store
        .dashboards
        .get(&id)
        .is_some_and(|d| d.user_id == user_id);
    if !owned {
        return Err(StatusCode::NOT_FOUND);
    }
    store.dashboards.remove(&id);
    store.transmissions.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn create_transmission(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(auth): Query<ApiKeyParam>,
    Json(payload): Json<Value>,
) -> Result<StatusCode, StatusCode> {
    if !payload.is_object() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut store = db.write();
    let user_id = authenticate(&store, &auth)?;
    let owned = store
        .dashboards
        .get(&id)
        .is_some_and(|d| d.user_id == user_id);
    if !owned {
        return Err(StatusCode::NOT_FOUND);
    }
    store.transmissions.entry(id).or_default().push(payload);
    Ok(StatusCode::NO_CONTENT)
}

async fn create_widget(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(auth): Query<ApiKeyParam>,
    Json(spec): Json<WidgetSpec>,
) -> Result<(StatusCode, Json<Widget>), StatusCode> {
    let mut store = db.write();
    let user_id = authenticate(&store, &auth)?;
    let now = Utc::now();
    let widget = widget_from_spec(spec, &user_id, now, &[]);
    let dashboard = store
        .dashboards
        .get_mut(&id)
        .filter(|d| d.user_id == user_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    dashboard.widgets.push(widget.clone());
    dashboard.updated_at = now;
    Ok((StatusCode::CREATED, Json(widget)))
}

async fn update_widget(
    State(db): State<Db>,
    Path((id, widget_id)): Path<(String, String)>,
    Query(auth): Query<ApiKeyParam>,
    Json(patch): Json<WidgetPatch>,
) -> Result<Json<Widget>, StatusCode> {
    let mut store = db.write();
    let user_id = authenticate(&store, &auth)?;
    let now = Utc::now();
    let dashboard = store
        .dashboards
        .get_mut(&id)
        .filter(|d| d.user_id == user_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    let widget = dashboard
        .widgets
        .iter_mut()
        .find(|w| w.id == widget_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Some(template_id) = patch.widget_template_id {
        widget.widget_template_id = template_id;
    }
    if let Some(height) = patch.height {
        widget.height = height;
    }
    if let Some(width) = patch.width {
        widget.width = width;
    }
    if let Some(script) = patch.script {
        widget.script = script;
    }
    if let Some(script_type) = patch.script_type {
        widget.script_type = script_type;
    }
    if let Some(css) = patch.css {
        widget.css = css;
    }
    if let Some(scoped_css) = patch.scoped_css {
        widget.scoped_css = scoped_css;
    }
    if let Some(html) = patch.html {
        widget.html = html;
    }
    if let Some(name) = patch.name {
        widget.name = name;
    }
    if let Some(json) = patch.json {
        widget.json = json;
    }
    widget.updated_at = now;
    let updated = widget.clone();
    dashboard.updated_at = now;
    Ok(Json(updated))
}

async fn delete_widget(
    State(db): State<Db>,
    Path((id, widget_id)): Path<(String, String)>,
    Query(auth): Query<ApiKeyParam>,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write();
    let user_id = authenticate(&store, &auth)?;
    let dashboard = store
        .dashboards
        .get_mut(&id)
        .filter(|d| d.user_id == user_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    let index = dashboard
        .widgets
        .iter()
        .position(|w| w.id == widget_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    dashboard.widgets.remove(index);
    dashboard.updated_at = Utc::now();
    Ok(StatusCode::NO_CONTENT)
}
