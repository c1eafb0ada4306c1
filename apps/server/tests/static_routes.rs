use axum::{body::to_bytes, body::Body, http::Request};
use bookchat_server::{api::app_router, build_state, config::Config};
use tempfile::tempdir;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

#[tokio::test]
async fn serves_index_html_for_unknown_route() {
    let db_dir = tempdir().unwrap();
    let static_dir = tempdir().unwrap();
    let index_path = static_dir.path().join("index.html");
    std::fs::write(&index_path, "<html>chat</html>").unwrap();
    std::fs::write(static_dir.path().join("chat.js"), "// poller").unwrap();

    let config = Config::from_vars([
        (
            "BOOKCHAT_DB_PATH",
            db_dir.path().join("test.db").to_string_lossy().to_string(),
        ),
        (
            "BOOKCHAT_STATIC_DIR",
            static_dir.path().to_string_lossy().to_string(),
        ),
    ])
    .unwrap();
    let state = build_state(&config).await.unwrap();
    let static_service =
        ServeDir::new(static_dir.path()).fallback(ServeFile::new(index_path.clone()));
    let app = app_router(state, &config).fallback_service(static_service);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, "<html>chat</html>".as_bytes());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/chat.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, "// poller".as_bytes());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/some/page")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, "<html>chat</html>".as_bytes());
}
