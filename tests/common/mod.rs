#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use hotel_admin::cli::config::CliContext;
use hotel_admin::config::PanelConfig;

pub const ADMIN_EMAIL: &str = "admin@hotel.test";
pub const ADMIN_PASSWORD: &str = "secret";
pub const ADMIN_ID: &str = "u1";
pub const ADMIN_NAME: &str = "Ada Admin";

/// Collections served under `/<path>/{all,add,edit/:id,delete/:id}`.
struct Table {
    path: &'static str,
    many: &'static str,
    one: &'static str,
    required: &'static [&'static str],
}

static TABLES: [Table; 3] = [
    Table { path: "staff", many: "staff", one: "staff", required: &["name", "email"] },
    Table { path: "rooms", many: "rooms", one: "room", required: &["roomNumber", "category"] },
    Table { path: "services", many: "services", one: "service", required: &["name"] },
];

/// In-memory hotel backend state.
#[derive(Clone, Default)]
pub struct Backend {
    inner: Arc<Mutex<BackendState>>,
    next_id: Arc<AtomicU64>,
}

#[derive(Default)]
struct BackendState {
    tables: HashMap<&'static str, Vec<Value>>,
    logs: Vec<Value>,
    bookings: Vec<Value>,
    tokens: HashSet<String>,
}

impl Backend {
    fn state(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.inner.lock().unwrap()
    }

    fn new_id(&self) -> String {
        format!("id{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 100)
    }

    pub fn seed(&self, path: &'static str, rows: Vec<Value>) {
        self.state().tables.insert(path, rows);
    }

    pub fn seed_logs(&self, rows: Vec<Value>) {
        self.state().logs = rows;
    }

    /// Bookings as `{ "month": ..., "amount": ... }`, feeding the summary stats.
    pub fn seed_bookings(&self, rows: Vec<Value>) {
        self.state().bookings = rows;
    }

    pub fn rows(&self, path: &str) -> Vec<Value> {
        self.state().tables.get(path).cloned().unwrap_or_default()
    }

    pub fn logs(&self) -> Vec<Value> {
        self.state().logs.clone()
    }

    /// Sign a token for the admin user and accept it from now on.
    pub fn issue_token(&self) -> String {
        let token = sign_token(ADMIN_ID, ADMIN_NAME, Utc::now().timestamp() + 3600);
        self.state().tokens.insert(token.clone());
        token
    }

    /// Make every outstanding token invalid server-side.
    pub fn revoke_tokens(&self) {
        self.state().tokens.clear();
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match token {
            Some(token) if self.state().tokens.contains(token) => Ok(()),
            _ => Err(error(StatusCode::UNAUTHORIZED, "Unauthorized")),
        }
    }

    fn audit(&self, action: String) {
        let entry = json!({
            "_id": self.new_id(),
            "user": { "name": ADMIN_NAME, "email": ADMIN_EMAIL },
            "action": action,
            "timestamp": Utc::now().to_rfc3339(),
        });
        self.state().logs.push(entry);
    }
}

pub fn sign_token(user_id: &str, name: &str, exp: i64) -> String {
    encode(
        &Header::default(),
        &json!({ "userId": user_id, "name": name, "exp": exp }),
        &EncodingKey::from_secret(b"mock-backend-secret"),
    )
    .unwrap()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn login(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    if body["email"] == ADMIN_EMAIL && body["password"] == ADMIN_PASSWORD {
        let token = backend.issue_token();
        return Json(json!({ "token": token })).into_response();
    }
    error(StatusCode::UNAUTHORIZED, "Invalid credentials")
}

async fn list_logs(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if let Err(rejected) = backend.authorize(&headers) {
        return rejected;
    }
    Json(json!({ "logs": backend.logs() })).into_response()
}

/// Overview figures derived from the rooms table and the seeded bookings.
async fn summary_stats(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if let Err(rejected) = backend.authorize(&headers) {
        return rejected;
    }

    let rooms = backend.rows("rooms");
    let bookings = backend.state().bookings.clone();

    let occupied = rooms.iter().filter(|r| r["status"] == "Occupied").count();
    let occupancy_rate = if rooms.is_empty() {
        0.0
    } else {
        occupied as f64 * 100.0 / rooms.len() as f64
    };

    let mut categories: Vec<(String, u64)> = Vec::new();
    for room in &rooms {
        let category = room["category"].as_str().unwrap_or_default().to_string();
        match categories.iter_mut().find(|(name, _)| *name == category) {
            Some(entry) => entry.1 += 1,
            None => categories.push((category, 1)),
        }
    }

    let mut months: Vec<(String, f64)> = Vec::new();
    for booking in &bookings {
        let month = booking["month"].as_str().unwrap_or_default().to_string();
        let amount = booking["amount"].as_f64().unwrap_or_default();
        match months.iter_mut().find(|(name, _)| *name == month) {
            Some(entry) => entry.1 += amount,
            None => months.push((month, amount)),
        }
    }
    let total: f64 = months.iter().map(|(_, amount)| amount).sum();

    Json(json!({
        "bookings": { "total": bookings.len() },
        "revenue": {
            "total": total,
            "byMonth": months.iter().map(|(month, amount)| json!({ "month": month, "amount": amount })).collect::<Vec<_>>(),
        },
        "occupancyRate": occupancy_rate,
        "categoryDistribution": categories
            .iter()
            .map(|(category, count)| json!({ "category": category, "count": count }))
            .collect::<Vec<_>>(),
    }))
    .into_response()
}

async fn list_rows(backend: Backend, headers: HeaderMap, table: &'static Table) -> Response {
    if let Err(rejected) = backend.authorize(&headers) {
        return rejected;
    }
    let key = table.many;
    Json(json!({ key: backend.rows(table.path) })).into_response()
}

async fn add_row(backend: Backend, headers: HeaderMap, body: Value, table: &'static Table) -> Response {
    if let Err(rejected) = backend.authorize(&headers) {
        return rejected;
    }
    if let Some(missing) = table.required.iter().find(|f| body.get(**f).map_or(true, Value::is_null)) {
        return error(StatusCode::BAD_REQUEST, &format!("{} is required", missing));
    }

    let mut row = body;
    row["_id"] = json!(backend.new_id());
    backend.state().tables.entry(table.path).or_default().push(row.clone());
    backend.audit(format!("Created {}", table.one));

    let key = table.one;
    (StatusCode::CREATED, Json(json!({ key: row }))).into_response()
}

async fn edit_row(
    backend: Backend,
    headers: HeaderMap,
    id: String,
    body: Value,
    table: &'static Table,
) -> Response {
    if let Err(rejected) = backend.authorize(&headers) {
        return rejected;
    }

    let updated = {
        let mut state = backend.state();
        let rows = state.tables.entry(table.path).or_default();
        let Some(row) = rows.iter_mut().find(|r| r["_id"] == id.as_str()) else {
            return error(StatusCode::NOT_FOUND, &format!("{} not found", table.one));
        };
        if let (Some(target), Some(changes)) = (row.as_object_mut(), body.as_object()) {
            for (k, v) in changes {
                target.insert(k.clone(), v.clone());
            }
        }
        row.clone()
    };
    backend.audit(format!("Updated {} {}", table.one, id));

    let key = table.one;
    Json(json!({ key: updated })).into_response()
}

async fn delete_row(backend: Backend, headers: HeaderMap, id: String, table: &'static Table) -> Response {
    if let Err(rejected) = backend.authorize(&headers) {
        return rejected;
    }

    let removed = {
        let mut state = backend.state();
        let rows = state.tables.entry(table.path).or_default();
        let before = rows.len();
        rows.retain(|r| r["_id"] != id.as_str());
        rows.len() != before
    };
    if !removed {
        return error(StatusCode::NOT_FOUND, &format!("{} not found", table.one));
    }
    backend.audit(format!("Deleted {} {}", table.one, id));

    Json(json!({ "message": "Deleted" })).into_response()
}

fn router(backend: Backend) -> Router {
    let mut router = Router::new()
        .route("/auth/login", post(login))
        .route("/system-logs", get(list_logs))
        .route("/hotel-stats/summary", get(summary_stats));

    for table in TABLES.iter() {
        router = router
            .route(
                &format!("/{}/all", table.path),
                get(move |State(b): State<Backend>, h: HeaderMap| list_rows(b, h, table)),
            )
            .route(
                &format!("/{}/add", table.path),
                post(move |State(b): State<Backend>, h: HeaderMap, Json(body): Json<Value>| {
                    add_row(b, h, body, table)
                }),
            )
            .route(
                &format!("/{}/edit/:id", table.path),
                put(
                    move |State(b): State<Backend>, Path(id): Path<String>, h: HeaderMap, Json(body): Json<Value>| {
                        edit_row(b, h, id, body, table)
                    },
                ),
            )
            .route(
                &format!("/{}/delete/:id", table.path),
                delete(move |State(b): State<Backend>, Path(id): Path<String>, h: HeaderMap| {
                    delete_row(b, h, id, table)
                }),
            );
    }

    router.with_state(backend)
}

/// Mock backend listening on a free local port for the lifetime of the value.
pub struct MockServer {
    pub base_url: String,
    pub backend: Backend,
    handle: JoinHandle<()>,
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn start_server() -> Result<MockServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind mock backend")?;

    let backend = Backend::default();
    let app = router(backend.clone());
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(MockServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        backend,
        handle,
    })
}

/// Fresh, empty directory for a test's token file.
pub fn temp_config_dir(name: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let dir = std::env::temp_dir().join(format!(
        "hotel-admin-it-{}-{}-{}",
        name,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn test_config(server: &MockServer) -> PanelConfig {
    let mut config = PanelConfig::development();
    config.api.base_url = server.base_url.clone();
    config.api.timeout_secs = 5;
    config.session.watch_interval_ms = 25;
    config
}

/// CLI context talking to `server`, with a token file under a fresh directory.
pub fn context(server: &MockServer, name: &str) -> Result<CliContext> {
    CliContext::with_config_dir(test_config(server), &temp_config_dir(name))
}

/// Same as [`context`], already holding a token the server accepts.
pub fn logged_in_context(server: &MockServer, name: &str) -> Result<CliContext> {
    use hotel_admin::session::CredentialStore;

    let context = context(server, name)?;
    context.store.set(&server.backend.issue_token())?;
    Ok(context)
}
