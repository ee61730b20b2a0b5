//! Metadata indirection against a local stand-in for the metadata server.

use axum::{
    Router,
    extract::Path,
    http::{HeaderMap, StatusCode},
    routing::get,
};
use gitmirror::core::JobSpec;
use gitmirror::core::resolver::{GceMetadata, JobResolver, JobSource, MetadataSource};
use gitmirror::error::ConfigError;

async fn attribute(Path(name): Path<String>, headers: HeaderMap) -> (StatusCode, String) {
    if headers.get("Metadata-Flavor").and_then(|v| v.to_str().ok()) != Some("Google") {
        return (StatusCode::FORBIDDEN, "missing Metadata-Flavor".to_string());
    }

    match name.as_str() {
        "repos" => (
            StatusCode::OK,
            r#"[{"ID":"a","From":"metadata:source","To":"repo-y"}]"#.to_string(),
        ),
        "source" => (
            StatusCode::OK,
            "https://token@example.com/x.git\n".to_string(),
        ),
        _ => (StatusCode::NOT_FOUND, "not found".to_string()),
    }
}

async fn serve() -> String {
    let app = Router::new().route(
        "/computeMetadata/v1/project/attributes/{name}",
        get(attribute),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn reads_trimmed_attribute() {
    let metadata = GceMetadata::new(serve().await);

    let value = metadata.project_attribute("source").await.unwrap();

    assert_eq!(value, "https://token@example.com/x.git");
}

#[tokio::test]
async fn unknown_attribute_is_an_error() {
    let metadata = GceMetadata::new(serve().await);
    assert!(metadata.project_attribute("nope").await.is_err());
}

#[tokio::test]
async fn repos_and_endpoints_resolve_through_metadata() {
    let metadata = GceMetadata::new(serve().await);
    let resolver = JobResolver::new(&metadata);

    let specs = resolver
        .resolve(JobSource::Json("metadata:repos".to_string()))
        .await
        .unwrap();

    assert_eq!(
        specs,
        vec![JobSpec::new("a", "https://token@example.com/x.git", "repo-y")]
    );
}

#[tokio::test]
async fn resolution_failure_is_fatal() {
    let metadata = GceMetadata::new(serve().await);
    let resolver = JobResolver::new(&metadata);

    let err = resolver
        .resolve(JobSource::Legacy {
            from: "metadata:missing".to_string(),
            to: "repo-y".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigError::Metadata { .. }));
}
