//! Fixture API for exercising content negotiation over real HTTP.
//!
//! Every route answers with a specific combination of status and
//! content type: JSON successes and JSON API errors, an empty 204, a vendor
//! JSON type, plain text, HTML (no codec), a malformed content type, and
//! echo routes for query strings, headers and form bodies.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct NewUser {
    pub login: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiMessage {
    pub message: String,
}

pub type Db = Arc<RwLock<HashMap<String, User>>>;

pub const VENDOR_JSON: &str = "application/vnd.parley.v1+json; charset=utf-8";

fn seed() -> HashMap<String, User> {
    let octocat = User {
        id: Uuid::nil(),
        login: "octocat".to_string(),
        name: "The Octocat".to_string(),
    };
    HashMap::from([(octocat.login.clone(), octocat)])
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(seed()));
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{login}", get(get_user).delete(delete_user))
        .route("/search", get(echo_query))
        .route("/headers", get(echo_headers))
        .route("/forms", post(echo_form))
        .route("/status/{code}", get(status_code))
        .route("/empty", get(empty))
        .route("/vendor", get(vendor))
        .route("/text", get(text))
        .route("/html", get(html))
        .route("/malformed", get(malformed))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn not_found() -> (StatusCode, Json<ApiMessage>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiMessage {
            message: "Not Found".to_string(),
        }),
    )
}

async fn get_user(
    State(db): State<Db>,
    Path(login): Path<String>,
) -> Result<Json<User>, (StatusCode, Json<ApiMessage>)> {
    let users = db.read().await;
    users.get(&login).cloned().map(Json).ok_or_else(not_found)
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), (StatusCode, Json<ApiMessage>)> {
    let mut users = db.write().await;
    if users.contains_key(&input.login) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiMessage {
                message: format!("login {} is taken", input.login),
            }),
        ));
    }
    let user = User {
        id: Uuid::new_v4(),
        login: input.login,
        name: input.name,
    };
    users.insert(user.login.clone(), user.clone());
    tracing::debug!(login = %user.login, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn delete_user(
    State(db): State<Db>,
    Path(login): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ApiMessage>)> {
    let mut users = db.write().await;
    users
        .remove(&login)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(not_found)
}

async fn echo_query(
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<BTreeMap<String, String>> {
    Json(params)
}

async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let echoed = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    Json(echoed)
}

async fn echo_form(
    Form(fields): Form<BTreeMap<String, String>>,
) -> Json<BTreeMap<String, String>> {
    Json(fields)
}

async fn status_code(Path(code): Path<u16>) -> Result<impl IntoResponse, StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((
        status,
        Json(ApiMessage {
            message: format!("status {code}"),
        }),
    ))
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn vendor() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, VENDOR_JSON)],
        r#"{"message":"vendor"}"#,
    )
}

async fn text() -> &'static str {
    "plain hello"
}

async fn html() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html")], "<p>hello</p>")
}

async fn malformed() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "json")], r#"{"message":"malformed"}"#)
}
