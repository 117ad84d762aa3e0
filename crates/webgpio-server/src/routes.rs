//! Axum router built from the frozen control route table.
//!
//! Each [`RouteEntry`](webgpio_core::RouteEntry) becomes an exact-path axum
//! route. Unmatched paths get axum's 404 and wrong methods its 405; the core
//! handlers never see them.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    routing::{MethodFilter, MethodRouter},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::error;

use webgpio_core::handlers::{self, HandlerContext, Response};
use webgpio_core::{Handler, Method, RouteTable};

/// Create the control router.
pub fn build_router(routes: &RouteTable, ctx: HandlerContext) -> Router {
    let ctx = Arc::new(ctx);

    // Entries sharing a path are merged into one method router.
    let mut by_path: BTreeMap<&'static str, MethodRouter> = BTreeMap::new();
    for entry in routes {
        let handler = entry.handler;
        let ctx = ctx.clone();
        let endpoint = move || dispatch(handler, ctx.clone());

        let method_router = by_path
            .remove(entry.path)
            .unwrap_or_else(MethodRouter::new)
            .on(method_filter(entry.method), endpoint);
        by_path.insert(entry.path, method_router);
    }

    by_path
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(path, method_router)
        })
        .layer(TraceLayer::new_for_http())
}

fn method_filter(method: Method) -> MethodFilter {
    match method {
        Method::Get => MethodFilter::GET,
        Method::Post => MethodFilter::POST,
    }
}

/// Run a core handler off the async workers; file reads block.
async fn dispatch(handler: Handler, ctx: Arc<HandlerContext>) -> HttpResponse {
    let response = tokio::task::spawn_blocking(move || handlers::handle(&handler, &ctx))
        .await
        .unwrap_or_else(|e| {
            error!("Handler task failed: {}", e);
            Response::server_error()
        });
    into_http(response)
}

fn into_http(response: Response) -> HttpResponse {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match response.content_type {
        Some(content_type) => {
            (status, [(header::CONTENT_TYPE, content_type)], response.body).into_response()
        }
        None if response.body.is_empty() => status.into_response(),
        None => (status, response.body).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::SimulatedPin;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::fs;
    use tower::ServiceExt;
    use webgpio_core::{Actuator, Level, Polarity};

    fn router(root: &std::path::Path) -> (Router, HandlerContext) {
        let (pin, _monitor) = SimulatedPin::new(4);
        let ctx = HandlerContext {
            assets_root: root.to_path_buf(),
            actuator: Actuator::shared(Box::new(pin), Polarity::ActiveLow).unwrap(),
        };
        (
            build_router(&RouteTable::control(Method::Post), ctx.clone()),
            ctx,
        )
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_route_serves_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>lamp</h1>").unwrap();
        let (app, _) = router(dir.path());

        let response = app.oneshot(request("GET", "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>lamp</h1>");
    }

    #[tokio::test]
    async fn test_missing_asset_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = router(dir.path());

        let response = app.oneshot(request("GET", "/styling.css")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_gpio_route_sets_actuator() {
        let dir = tempfile::tempdir().unwrap();
        let (app, ctx) = router(dir.path());

        let response = app.oneshot(request("POST", "/gpio/on")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
        assert_eq!(
            webgpio_core::actuator::lock(&ctx.actuator).level(),
            Some(Level::On)
        );
    }

    #[tokio::test]
    async fn test_unregistered_path_is_404() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "x").unwrap();
        let (app, _) = router(dir.path());

        let response = app.oneshot(request("GET", "/index.html")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_does_not_reach_handler() {
        let dir = tempfile::tempdir().unwrap();
        let (app, ctx) = router(dir.path());

        let response = app.oneshot(request("GET", "/gpio/on")).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(webgpio_core::actuator::lock(&ctx.actuator).level(), None);
    }
}
