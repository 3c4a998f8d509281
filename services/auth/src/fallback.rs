//! Ordered API routes with the single-page application as fallback
//!
//! API routers are mounted under enumerated prefixes, in order. Files that
//! exist in the SPA build directory are served ahead of the API, without a
//! session. Any other path outside the API prefixes gets the SPA's
//! `index.html`. Paths under an API prefix never reach the SPA, even when no
//! API route matches them.

use axum::{
    Json, Router,
    body::Body,
    extract::Request,
    http::{Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{path::PathBuf, sync::Arc};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::debug;

use crate::{
    error::AuthError,
    guard::{Access, RouteClass, authorize_request, require_authenticated},
};

/// Result of matching a path against the API prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMatch<'a> {
    /// The path belongs to the API mounted at `prefix`
    Api { prefix: &'a str, class: RouteClass },
    /// The path belongs to the SPA
    Shell,
}

/// The enumerated API prefixes and their route classes, in mount order
#[derive(Debug, Clone)]
pub struct ApiPrefixes(Arc<[(String, RouteClass)]>);

impl ApiPrefixes {
    /// A path is under a prefix when it equals it or continues with `/`.
    pub fn classify<'a>(&'a self, path: &str) -> RouteMatch<'a> {
        self.0
            .iter()
            .find(|(prefix, _)| {
                path.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .map_or(RouteMatch::Shell, |(prefix, class)| RouteMatch::Api {
                prefix: prefix.as_str(),
                class: *class,
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(prefix, _)| prefix.as_str())
    }
}

/// Location of the built single-page application
#[derive(Debug, Clone)]
pub struct SpaShell {
    root: PathBuf,
}

impl SpaShell {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The entry document served for unmatched paths
    pub fn index_path(&self) -> PathBuf {
        self.root.join("index.html")
    }

    /// Put the build directory in front of `app`.
    ///
    /// Existing files are answered directly; everything else, and every path
    /// under an API prefix, is handed to `app`.
    pub fn serve(&self, prefixes: ApiPrefixes, app: Router) -> Router {
        let assets = ServeDir::new(&self.root)
            .call_fallback_on_method_not_allowed(true)
            .fallback(app.clone());

        Router::new().fallback(move |req: Request| {
            let prefixes = prefixes.clone();
            let assets = assets.clone();
            let app = app.clone();
            async move { serve_request(&prefixes, assets, app, req).await }
        })
    }
}

struct ApiMount<S> {
    prefix: String,
    class: RouteClass,
    router: Option<Router<S>>,
}

/// Explicit, ordered list of API mounts; the SPA fallback is always last
pub struct RouteTable<S> {
    mounts: Vec<ApiMount<S>>,
}

impl<S> Default for RouteTable<S> {
    fn default() -> Self {
        Self { mounts: Vec::new() }
    }
}

impl<S> RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `router` under `prefix`. Protected mounts get the route guard.
    ///
    /// # Panics
    ///
    /// If `prefix` is not an absolute, non-root path, or is already mounted.
    pub fn mount(mut self, prefix: &str, class: RouteClass, router: Router<S>) -> Self {
        let prefix = self.check_prefix(prefix);
        self.mounts.push(ApiMount {
            prefix,
            class,
            router: Some(router),
        });
        self
    }

    /// Claim `prefix` for the API without routes of its own, so the SPA
    /// never answers under it. Protected prefixes answer anonymous requests
    /// with 401, everything else with 404.
    ///
    /// # Panics
    ///
    /// Same conditions as [`RouteTable::mount`].
    pub fn reserve(mut self, prefix: &str, class: RouteClass) -> Self {
        let prefix = self.check_prefix(prefix);
        self.mounts.push(ApiMount {
            prefix,
            class,
            router: None,
        });
        self
    }

    fn check_prefix(&self, prefix: &str) -> String {
        let prefix = prefix.trim_end_matches('/');
        assert!(
            prefix.starts_with('/'),
            "API prefix must be a non-root absolute path: {:?}",
            prefix
        );
        assert!(
            self.mounts.iter().all(|mount| mount.prefix != prefix),
            "API prefix mounted twice: {}",
            prefix
        );
        prefix.to_string()
    }

    pub fn prefixes(&self) -> ApiPrefixes {
        ApiPrefixes(
            self.mounts
                .iter()
                .map(|mount| (mount.prefix.clone(), mount.class))
                .collect(),
        )
    }

    /// Nest every mount in order, then install the `index.html` catch-all.
    pub fn build(self, shell: &SpaShell) -> Router<S> {
        let prefixes = self.prefixes();
        let mut router = Router::new();

        for mount in self.mounts {
            let Some(routes) = mount.router else {
                continue;
            };
            let routes = match mount.class {
                RouteClass::Public => routes,
                RouteClass::Protected => {
                    routes.route_layer(middleware::from_fn(require_authenticated))
                }
            };
            router = router.nest(&mount.prefix, routes);
        }

        let index = ServeFile::new(shell.index_path());
        router.fallback(move |req: Request| {
            let prefixes = prefixes.clone();
            let index = index.clone();
            async move { serve_fallback(&prefixes, index, req).await }
        })
    }
}

async fn serve_request(
    prefixes: &ApiPrefixes,
    assets: ServeDir<Router>,
    app: Router,
    req: Request,
) -> Response {
    let result = match prefixes.classify(req.uri().path()) {
        RouteMatch::Api { .. } => app.oneshot(req).await,
        RouteMatch::Shell => assets
            .oneshot(req)
            .await
            .map(|response| response.map(Body::new)),
    };

    match result {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

async fn serve_fallback(prefixes: &ApiPrefixes, index: ServeFile, req: Request) -> Response {
    if let RouteMatch::Api { prefix, class } = prefixes.classify(req.uri().path()) {
        if let Access::Reject(rejection) = authorize_request(&req, class) {
            debug!("Rejected request to {}: {:?}", req.uri().path(), rejection);
            return AuthError::from(rejection).into_response();
        }
        debug!("No API route for {} under {}", req.uri().path(), prefix);
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response();
    }

    if req.method() != Method::GET && req.method() != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    match index.oneshot(req).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    const SHELL: &str = "<!doctype html><div id=\"root\"></div>";

    fn spa_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), SHELL).unwrap();
        std::fs::create_dir(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/app.js"), "console.log(1)").unwrap();
        dir
    }

    fn app(dir: &TempDir) -> Router {
        let shell = SpaShell::new(dir.path());
        let table = RouteTable::new()
            .mount(
                "/api",
                RouteClass::Public,
                Router::new().route("/ping", get(|| async { "pong" })),
            )
            .reserve("/projects", RouteClass::Protected)
            .reserve("/archive", RouteClass::Public);
        let prefixes = table.prefixes();
        let inner = table.build(&shell);
        shell.serve(prefixes, inner)
    }

    async fn send(router: Router, method: Method, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[test]
    fn test_classify() {
        let prefixes = RouteTable::<()>::new()
            .reserve("/auth", RouteClass::Public)
            .reserve("/userData/", RouteClass::Protected)
            .prefixes();

        assert_eq!(
            prefixes.classify("/auth"),
            RouteMatch::Api {
                prefix: "/auth",
                class: RouteClass::Public
            }
        );
        assert_eq!(
            prefixes.classify("/auth/login"),
            RouteMatch::Api {
                prefix: "/auth",
                class: RouteClass::Public
            }
        );
        assert_eq!(
            prefixes.classify("/userData"),
            RouteMatch::Api {
                prefix: "/userData",
                class: RouteClass::Protected
            }
        );
        assert_eq!(prefixes.classify("/authors"), RouteMatch::Shell);
        assert_eq!(prefixes.classify("/"), RouteMatch::Shell);
        assert_eq!(prefixes.classify("/anything/else"), RouteMatch::Shell);
        assert_eq!(prefixes.iter().collect::<Vec<_>>(), vec!["/auth", "/userData"]);
    }

    #[test]
    #[should_panic(expected = "mounted twice")]
    fn test_duplicate_prefix_panics() {
        let _ = RouteTable::<()>::new()
            .reserve("/auth", RouteClass::Public)
            .reserve("/auth/", RouteClass::Protected);
    }

    #[test]
    #[should_panic(expected = "non-root")]
    fn test_root_prefix_panics() {
        let _ = RouteTable::<()>::new().reserve("/", RouteClass::Public);
    }

    #[tokio::test]
    async fn test_unmatched_path_serves_shell() {
        let dir = spa_dir();
        let (status, body) = send(app(&dir), Method::GET, "/anything").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, SHELL);

        let (status, body) = send(app(&dir), Method::GET, "/projects-board/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, SHELL);
    }

    #[tokio::test]
    async fn test_static_assets_are_served() {
        let dir = spa_dir();
        let (status, body) = send(app(&dir), Method::GET, "/static/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log(1)");
    }

    #[tokio::test]
    async fn test_api_routes_win() {
        let dir = spa_dir();
        let (status, body) = send(app(&dir), Method::GET, "/api/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "pong");
    }

    #[tokio::test]
    async fn test_api_paths_never_reach_static_files() {
        let dir = spa_dir();
        std::fs::create_dir(dir.path().join("api")).unwrap();
        std::fs::write(dir.path().join("api/ping"), "stale").unwrap();

        let (status, body) = send(app(&dir), Method::GET, "/api/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "pong");
    }

    #[tokio::test]
    async fn test_unknown_api_paths_never_fall_through() {
        let dir = spa_dir();

        let (status, body) = send(app(&dir), Method::GET, "/api/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.contains("root"));

        let (status, body) = send(app(&dir), Method::GET, "/archive/2024").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.contains("root"));
    }

    #[tokio::test]
    async fn test_protected_reserved_prefix_requires_a_user() {
        let dir = spa_dir();
        let (status, body) = send(app(&dir), Method::GET, "/projects").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!body.contains("root"));
    }

    #[tokio::test]
    async fn test_non_get_requests_to_shell_are_rejected() {
        let dir = spa_dir();
        let (status, _) = send(app(&dir), Method::POST, "/anything").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = send(app(&dir), Method::POST, "/static/app.js").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
