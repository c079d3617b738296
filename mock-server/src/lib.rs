use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// Credentials accepted by `/basic-auth`: `postman:password`.
pub const BASIC_AUTH: &str = "Basic cG9zdG1hbjpwYXNzd29yZA==";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
}

/// What `/echo` saw of the incoming request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub type Db = Arc<RwLock<BTreeMap<u64, User>>>;

fn seeded_db() -> Db {
    let mut users = BTreeMap::new();
    users.insert(
        1,
        User {
            id: 1,
            name: "Leanne Graham".to_string(),
        },
    );
    Arc::new(RwLock::new(users))
}

pub fn app() -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/status/{code}", any(status))
        .route("/basic-auth", get(basic_auth))
        .route("/xml", get(xml))
        .route("/latin1", get(latin1))
        .route("/bytes/{len}", get(bytes))
        .route("/redirect", get(redirect))
        .with_state(seeded_db())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    let users = db.read().await;
    Json(users.values().cloned().collect())
}

async fn create_user(State(db): State<Db>, Json(input): Json<CreateUser>) -> (StatusCode, Json<User>) {
    let mut users = db.write().await;
    let id = users.keys().next_back().copied().unwrap_or(0) + 1;
    let user = User { id, name: input.name };
    users.insert(id, user.clone());
    (StatusCode::CREATED, Json(user))
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<User>, StatusCode> {
    let users = db.read().await;
    users.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_user(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, StatusCode> {
    let mut users = db.write().await;
    users.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}

async fn echo(method: Method, uri: Uri, RawQuery(query): RawQuery, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        headers,
        body,
    })
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn basic_auth(headers: HeaderMap) -> StatusCode {
    match headers.get(header::AUTHORIZATION) {
        Some(value) if value.as_bytes() == BASIC_AUTH.as_bytes() => StatusCode::OK,
        _ => StatusCode::UNAUTHORIZED,
    }
}

async fn xml() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/xml")],
        "<?xml version=\"1.0\"?><foo><bar>abc</bar></foo>",
    )
}

async fn latin1() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=iso-8859-1")],
        vec![0x63u8, 0x61, 0x66, 0xE9],
    )
}

/// `len` bytes of `x`.
async fn bytes(Path(len): Path<usize>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], vec![b'x'; len])
}

async fn redirect() -> Redirect {
    Redirect::to("/echo")
}
