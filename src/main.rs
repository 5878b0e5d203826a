#![deny(clippy::all, clippy::pedantic)]

mod config;
mod database;
mod error;
mod gateway;
mod models;

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, rejection::JsonRejection},
    http::{
        HeaderMap, HeaderName,
        header::{HOST, ORIGIN},
    },
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use config::Config;
use database::Database;
use error::{ErrorPage, URLError};
use gateway::StorageGateway;
use models::{ShortenRequest, ShortenResponse};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
struct AppState {
    gateway: StorageGateway,
    base_url: Option<String>,
}

#[tracing::instrument(skip_all)]
async fn shorten_url_route(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Json<ShortenResponse>, URLError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "rejected shorten payload");
        URLError::Validation
    })?;

    // Resolved before the insert so a failure here leaves no orphaned record.
    let base = link_base(&headers, state.base_url.as_deref())
        .ok_or(URLError::Internal("no origin, BASE_URL or host to build a short link"))?;

    let record = state.gateway.create(&payload.original_url).await?;

    Ok(Json(ShortenResponse {
        short_url: format!("{base}/{}", record.id.to_hex()),
    }))
}

#[tracing::instrument(skip(state))]
async fn redirect_route(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ErrorPage> {
    let record = state.gateway.find_by_id(&id).await?;
    let target = record.target().map_err(|err| {
        tracing::error!(err = ?err, id = %record.id, "stored url does not parse");
        URLError::Internal("stored url does not parse")
    })?;

    Ok(Redirect::temporary(target.as_str()).into_response())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != "null")
}

/// Picks the base of a short link: the request origin, then the configured
/// base URL, then the `Host` header.
fn link_base(headers: &HeaderMap, configured: Option<&str>) -> Option<String> {
    header_value(headers, &ORIGIN)
        .map(str::to_string)
        .or_else(|| configured.map(str::to_string))
        .or_else(|| header_value(headers, &HOST).map(|host| format!("http://{host}")))
        .map(|base| base.trim_end_matches('/').to_string())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/shorten", post(shorten_url_route))
        .route("/{id}", get(redirect_route))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(state)),
        )
}

/// Connects the store and builds the application router.
///
/// An unreachable database is logged but not fatal; requests report it until the store recovers.
async fn setup(config: &Config) -> Result<Router, mongodb::error::Error> {
    let database =
        Database::new(&config.mongodb_uri, &config.database, config.store_timeout).await?;
    match database.ping().await {
        Ok(()) => tracing::info!(database = %config.database, "connected to mongodb"),
        Err(err) => tracing::warn!(err = ?err, "mongodb is not reachable yet"),
    }

    let gateway = StorageGateway::new(Arc::new(database), config.store_timeout);

    Ok(router(AppState {
        gateway,
        base_url: config.base_url.clone(),
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let app = setup(&config).await?;

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::LOCATION},
    };
    use bson::oid::ObjectId;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::database::{MockUrlStore, memory::MemoryStore};

    fn test_app(store: Arc<MemoryStore>, base_url: Option<&str>) -> Router {
        router(AppState {
            gateway: StorageGateway::new(store, Duration::from_secs(1)),
            base_url: base_url.map(str::to_string),
        })
    }

    fn shorten_request(body: &str) -> Request<Body> {
        Request::post("/api/shorten")
            .header("Content-Type", "application/json")
            .header(ORIGIN, "https://sho.rt")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice::<Value>(&body_bytes).unwrap()
    }

    async fn text_body(response: Response) -> String {
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body_bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn shorten_then_redirect() {
        let app = test_app(Arc::default(), None);

        let body = json!({ "originalUrl": "https://example.com/article" });
        let response = app
            .clone()
            .oneshot(shorten_request(&body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        let short_url = json["shortUrl"].as_str().unwrap();
        let id = short_url.strip_prefix("https://sho.rt/").unwrap();
        assert!(ObjectId::parse_str(id).is_ok());

        let redirect_response = app
            .oneshot(Request::get(format!("/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(redirect_response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            redirect_response.headers().get(LOCATION).unwrap(),
            "https://example.com/article"
        );
    }

    #[tokio::test]
    async fn shorten_rejects_invalid_payloads() {
        let app = test_app(Arc::default(), None);

        for body in [
            r#"{ "originalUrl": "" }"#,
            r#"{ "originalUrl": "   " }"#,
            r#"{ "originalUrl": null }"#,
            r#"{ "originalUrl": 42 }"#,
            r#"{ "originalUrl": "/invalid" }"#,
            r#"{ "originalUrl": "javascript:alert(1)" }"#,
            r#"{ "url": "https://example.com" }"#,
            r#"{ "originalUrl": "https://example.com", "extra": true }"#,
            "{}",
            "not json",
        ] {
            let response = app.clone().oneshot(shorten_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "accepted {body}");
            assert_eq!(json_body(response).await, json!({ "error": "Invalid URL" }));
        }
    }

    #[tokio::test]
    async fn short_url_base_falls_back_to_config_then_host() {
        let body = json!({ "originalUrl": "https://example.com" }).to_string();
        let request = |host: Option<&str>| {
            let mut builder =
                Request::post("/api/shorten").header("Content-Type", "application/json");
            if let Some(host) = host {
                builder = builder.header(HOST, host);
            }
            builder.body(Body::from(body.clone())).unwrap()
        };

        let configured = test_app(Arc::default(), Some("https://links.example"));
        let response = configured.oneshot(request(Some("internal:3000"))).await.unwrap();
        let json = json_body(response).await;
        assert!(json["shortUrl"].as_str().unwrap().starts_with("https://links.example/"));

        let bare = test_app(Arc::default(), None);
        let response = bare.clone().oneshot(request(Some("localhost:3000"))).await.unwrap();
        let json = json_body(response).await;
        assert!(json["shortUrl"].as_str().unwrap().starts_with("http://localhost:3000/"));

        let response = bare.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({ "error": "Internal Server Error" }));
    }

    #[test]
    fn link_base_ignores_null_origin_and_trailing_slash() {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, "null".parse().unwrap());
        assert_eq!(
            link_base(&headers, Some("https://sho.rt/")).as_deref(),
            Some("https://sho.rt")
        );

        headers.insert(ORIGIN, "https://app.example/".parse().unwrap());
        assert_eq!(
            link_base(&headers, Some("https://sho.rt")).as_deref(),
            Some("https://app.example")
        );
    }

    #[tokio::test]
    async fn redirect_invalid_id_skips_lookup() {
        let store = Arc::new(MemoryStore::default());
        let app = test_app(Arc::clone(&store), None);

        let response = app
            .oneshot(Request::get("/not-a-valid-id").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(LOCATION).is_none());
        assert_eq!(text_body(response).await, "<h1>Invalid URL</h1>");
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn redirect_unknown_id_is_not_found() {
        let store = Arc::new(MemoryStore::default());
        let app = test_app(Arc::clone(&store), None);

        let response = app
            .oneshot(
                Request::get(format!("/{}", ObjectId::new().to_hex()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text_body(response).await, "<h1>404 | URL Not Found</h1>");
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn storage_failures_are_not_leaked() {
        let mut store = MockUrlStore::new();
        store.expect_insert().returning(|_| {
            Err(std::io::Error::other("connection reset by mongo-0.internal").into())
        });
        store.expect_find().returning(|_| {
            Err(std::io::Error::other("connection reset by mongo-0.internal").into())
        });
        let app = router(AppState {
            gateway: StorageGateway::new(Arc::new(store), Duration::from_secs(1)),
            base_url: Some("https://sho.rt".to_string()),
        });

        let body = json!({ "originalUrl": "https://example.com" });
        let response = app
            .clone()
            .oneshot(shorten_request(&body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({ "error": "Internal Server Error" }));

        let response = app
            .oneshot(
                Request::get(format!("/{}", ObjectId::new().to_hex()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let page = text_body(response).await;
        assert!(!page.contains("mongo-0"));
    }
}
