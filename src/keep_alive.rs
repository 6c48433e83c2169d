//! Tiny HTTP endpoint for uptime pingers on hosts that idle silent processes

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub const ALIVE_TEXT: &str = "Hello. I am alive! Bot is running.";

async fn alive() -> &'static str {
    ALIVE_TEXT
}

pub fn create_router() -> Router {
    Router::new()
        .route("/", get(alive))
        .layer(TraceLayer::new_for_http())
}

/// Serve until `cancel` fires
pub async fn serve(port: u16, cancel: CancellationToken) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Keep-alive server listening");

    axum::serve(listener, create_router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_answers() {
        let response = create_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], ALIVE_TEXT.as_bytes());
    }

    #[tokio::test]
    async fn test_other_paths_are_not_found() {
        let response = create_router()
            .oneshot(Request::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
