//! HTTP surface
//!
//! Serves the static client bundle and exposes the current system
//! settings so the login page can be themed before a socket is opened.

use std::path::Path;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::AppError;
use crate::server::ServerCommand;
use crate::state::SystemSettings;

/// Build the HTTP router
pub fn router(cmd_tx: mpsc::Sender<ServerCommand>, static_dir: &Path) -> Router {
    Router::new()
        .route("/settings", get(get_settings))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(cmd_tx)
}

/// GET /settings
async fn get_settings(
    State(cmd_tx): State<mpsc::Sender<ServerCommand>>,
) -> Result<Json<SystemSettings>, StatusCode> {
    let (reply, rx) = oneshot::channel();
    if cmd_tx.send(ServerCommand::GetSettings { reply }).await.is_err() {
        warn!("Settings requested while the chat server is down");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    rx.await.map(Json).map_err(|_| StatusCode::SERVICE_UNAVAILABLE)
}

/// Run the HTTP server until the listener fails
pub async fn serve(listener: TcpListener, app: Router) -> Result<(), AppError> {
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP server listening on http://{}", addr);
    }
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    /// Stand-in actor answering settings queries
    fn fake_actor(settings: SystemSettings) -> mpsc::Sender<ServerCommand> {
        let (tx, mut rx) = mpsc::channel(8);
        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                if let ServerCommand::GetSettings { reply } = cmd {
                    let _ = reply.send(settings.clone());
                }
            }
        });
        tx
    }

    #[tokio::test]
    async fn test_settings_endpoint() {
        let settings = SystemSettings {
            site_title: "Night Owls".into(),
            ..SystemSettings::default()
        };
        let app = router(fake_actor(settings), Path::new("public"));

        let response = app
            .oneshot(Request::get("/settings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["siteTitle"], "Night Owls");
    }

    #[tokio::test]
    async fn test_settings_unavailable_without_actor() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let app = router(tx, Path::new("public"));

        let response = app
            .oneshot(Request::get("/settings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_missing_static_file() {
        let dir = std::env::temp_dir().join(format!("chat-static-{}", uuid::Uuid::new_v4()));
        let app = router(fake_actor(SystemSettings::default()), &dir);

        let response = app
            .oneshot(Request::get("/nope.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
