use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use url::form_urlencoded;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Container")]
    pub container: String,
    #[serde(rename = "RepoTags")]
    pub repo_tags: Vec<String>,
    #[serde(rename = "Comment")]
    pub comment: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Changes")]
    pub changes: Vec<String>,
    #[serde(rename = "Paused")]
    pub paused: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdResponse {
    #[serde(rename = "Id")]
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Daemon {
    containers: HashSet<String>,
    images: Vec<Image>,
}

pub type Db = Arc<RwLock<Daemon>>;

pub fn app() -> Router {
    app_with_containers(Vec::<String>::new())
}

/// Router for a daemon that already knows about `containers`.
pub fn app_with_containers<I, S>(containers: I) -> Router
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let daemon = Daemon {
        containers: containers.into_iter().map(Into::into).collect(),
        images: Vec::new(),
    };
    let db: Db = Arc::new(RwLock::new(daemon));
    Router::new()
        .route("/commit", post(commit))
        .route("/{version}/commit", post(versioned_commit))
        .route("/images/json", get(list_images))
        .with_state(db)
}

pub async fn run(listener: TcpListener, containers: Vec<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_containers(containers)).await
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

async fn versioned_commit(
    State(db): State<Db>,
    Path(version): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    if !version.starts_with('v') {
        return error(StatusCode::NOT_FOUND, format!("page not found: /{version}/commit"));
    }
    commit(State(db), RawQuery(query)).await
}

async fn commit(State(db): State<Db>, RawQuery(query): RawQuery) -> Response {
    let pairs: Vec<(String, String)> = form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .into_owned()
        .collect();
    let first = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };

    let container = first("container");
    if container.is_empty() {
        return error(StatusCode::BAD_REQUEST, "container is required");
    }
    let paused = match first("pause").as_str() {
        "" | "1" | "true" => true,
        "0" | "false" => false,
        other => {
            return error(
                StatusCode::BAD_REQUEST,
                format!("invalid pause value: {other}"),
            )
        }
    };

    let mut daemon = db.write().await;
    if !daemon.containers.contains(&container) {
        return error(
            StatusCode::NOT_FOUND,
            format!("No such container: {container}"),
        );
    }

    let repo = first("repo");
    let tag = first("tag");
    let repo_tags = match (repo.is_empty(), tag.is_empty()) {
        (true, _) => Vec::new(),
        (false, true) => vec![format!("{repo}:latest")],
        (false, false) => vec![format!("{repo}:{tag}")],
    };

    let image = Image {
        id: format!("sha256:{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
        container,
        repo_tags,
        comment: first("comment"),
        author: first("author"),
        changes: pairs
            .iter()
            .filter(|(k, _)| k == "changes")
            .map(|(_, v)| v.clone())
            .collect(),
        paused,
    };
    tracing::info!(id = %image.id, container = %image.container, "committed container");

    let id = image.id.clone();
    daemon.images.push(image);
    (StatusCode::CREATED, Json(IdResponse { id })).into_response()
}

async fn list_images(State(db): State<Db>) -> Json<Vec<Image>> {
    let daemon = db.read().await;
    Json(daemon.images.clone())
}
