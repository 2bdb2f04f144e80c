//! HTTP API over the post repository and access gate

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::access::{self, AccessError, AccessGate, AccessOutcome};
use crate::cache::POSTS_TAG;
use crate::content::{Access, PostEntry, PostFrontmatter, PostSummary};
use crate::repository::{PostLookup, PostRepository};
use crate::Folio;

/// Header carrying the revalidation secret
pub const REVALIDATE_TOKEN_HEADER: &str = "x-revalidate-token";

/// Server state
pub struct AppState {
    pub repo: PostRepository,
    pub gate: AccessGate,
    pub revalidate_token: Option<String>,
}

/// Server options
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub ip: String,
    pub port: u16,
    /// Read the content directory instead of the snapshot
    pub live: bool,
    /// Evict cached posts when the content directory changes (live only)
    pub watch: bool,
}

#[derive(Debug, Serialize)]
struct PostBody {
    slug: String,
    path: String,
    sha: String,
    frontmatter: PostFrontmatter,
    content: String,
}

impl PostBody {
    fn new(entry: &PostEntry, content: String) -> Self {
        Self {
            slug: entry.slug.clone(),
            path: entry.path.clone(),
            sha: entry.sha.clone(),
            frontmatter: entry.frontmatter.redacted(),
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UnlockRequest {
    password: String,
}

#[derive(Debug, Deserialize)]
struct RevalidateRequest {
    #[serde(default)]
    tag: Option<String>,
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/posts", get(list_handler))
        .route("/api/posts/:slug", get(post_handler))
        .route("/api/posts/:slug/unlock", post(unlock_handler))
        .route("/api/revalidate", post(revalidate_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(folio: &Folio, options: ServeOptions) -> Result<()> {
    let repo = if options.live {
        folio.live_repository()
    } else {
        folio.snapshot_repository()?
    };

    // fail at startup rather than on the first request
    let posts = repo.list_posts().await?;
    tracing::info!(
        "Serving {} with {} posts ({} mode)",
        folio.config.title,
        posts.len(),
        if options.live { "live" } else { "snapshot" }
    );

    let state = Arc::new(AppState {
        repo: repo.clone(),
        gate: folio.gate(),
        revalidate_token: folio.config.revalidate_token.clone(),
    });
    let app = router(state);

    let bind_ip = if options.ip == "localhost" {
        "127.0.0.1"
    } else {
        options.ip.as_str()
    };
    let addr: SocketAddr = format!("{}:{}", bind_ip, options.port).parse()?;

    println!("Server running at http://{}:{}", options.ip, options.port);
    if options.watch && options.live {
        println!("Watching {} for changes...", folio.posts_root.display());
        let posts_root = folio.posts_root.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_invalidate(posts_root, repo) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    } else if options.watch {
        tracing::warn!("--watch only applies with --live; the snapshot is static");
    }
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Evict cached posts whenever the posts directory changes
fn watch_and_invalidate(posts_root: PathBuf, repo: PostRepository) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;
    debouncer
        .watcher()
        .watch(&posts_root, RecursiveMode::Recursive)?;
    tracing::debug!("Watching: {:?}", posts_root);

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().any(|e| {
                    let path_str = e.path.to_string_lossy();
                    !path_str.contains(".git")
                        && !path_str.contains(".DS_Store")
                        && !path_str.ends_with('~')
                });
                if relevant {
                    tracing::info!("Content changed, evicting cached posts");
                    repo.invalidate(POSTS_TAG);
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Post not found")
}

fn access_error_response(err: &AccessError) -> Response {
    match err {
        AccessError::WrongPassword => error_response(StatusCode::FORBIDDEN, &err.to_string()),
        AccessError::MissingPassword { slug } => {
            tracing::error!(slug = %slug, "{}", err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "This post is protected but no password is configured",
            )
        }
    }
}

/// Fetch a post that may be served over HTTP; private posts read as missing
async fn servable_post(state: &AppState, slug: &str) -> Option<Arc<PostEntry>> {
    match state.repo.get_post_by_slug(slug).await {
        PostLookup::Found(entry) if entry.access() != Access::Private => Some(entry),
        _ => None,
    }
}

async fn list_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.repo.list_public_posts().await {
        Ok(posts) => {
            let posts: Vec<PostSummary> = posts.iter().map(PostSummary::redacted).collect();
            Json(posts).into_response()
        }
        Err(e) => {
            tracing::error!("Listing posts failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Posts are unavailable")
        }
    }
}

async fn post_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Some(entry) = servable_post(&state, &slug).await else {
        return not_found();
    };

    let name = access::cookie_name(&entry.slug);
    let presented = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookies| access::cookie_value(cookies, &name));

    match state.gate.read(&entry, presented) {
        Ok(AccessOutcome::Granted { content }) => Json(PostBody::new(&entry, content)).into_response(),
        Ok(AccessOutcome::Locked) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "locked": true,
                "slug": entry.slug,
                "title": entry.frontmatter.title,
            })),
        )
            .into_response(),
        Err(e) => access_error_response(&e),
    }
}

async fn unlock_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(request): Json<UnlockRequest>,
) -> Response {
    let Some(entry) = servable_post(&state, &slug).await else {
        return not_found();
    };

    match state.gate.unlock(&entry, &request.password) {
        Ok(unlocked) => {
            let body = Json(PostBody::new(&entry, unlocked.content));
            match unlocked.credential {
                Some(credential) => (
                    [(header::SET_COOKIE, credential.set_cookie_header())],
                    body,
                )
                    .into_response(),
                None => body.into_response(),
            }
        }
        Err(e) => access_error_response(&e),
    }
}

async fn revalidate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RevalidateRequest>,
) -> Response {
    let Some(expected) = &state.revalidate_token else {
        return error_response(StatusCode::NOT_FOUND, "Revalidation is disabled");
    };
    let presented = headers
        .get(REVALIDATE_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if presented != Some(expected.as_str()) {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid revalidation token");
    }

    let tag = request.tag.unwrap_or_else(|| POSTS_TAG.to_string());
    let removed = state.repo.invalidate(&tag);
    Json(json!({ "revalidated": tag, "entries": removed })).into_response()
}
