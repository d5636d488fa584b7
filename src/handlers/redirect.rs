use crate::state::AppState;
use axum::{
    extract::{Path, State, rejection::PathRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// /{*short_path} handler - Resolve a short path and redirect
///
/// Always answers `302 Found`. Unknown short paths, paths that do not decode
/// to UTF-8 and store failures all land on the configured home page.
#[utoipa::path(
    get,
    path = "/{short_path}",
    params(
        ("short_path" = String, Path, description = "Registered short path")
    ),
    responses(
        (status = 302, description = "Redirect to the long URL, or to the home page when the short path is unknown")
    ),
    tag = "redirect"
)]
pub async fn redirect_handler(
    State(state): State<AppState>,
    short_path: Result<Path<String>, PathRejection>,
) -> Response {
    let home = state.config.home_page_url.as_str();

    // The path is percent-decoded, matching the decoded `s` of a registration.
    let short_path = match short_path {
        Ok(Path(short_path)) => short_path,
        Err(rejection) => {
            tracing::info!("Unreadable short path, redirecting home: {}", rejection);
            return found(home);
        }
    };
    let short_path = short_path.as_str();

    match state.store.fetch(short_path).await {
        Ok(Some(long_url)) => {
            tracing::info!("Redirecting '{}' to {}", short_path, long_url);
            found_or_home(&long_url, home)
        }
        Ok(None) => {
            tracing::info!("Short path not found: '{}'", short_path);
            found(home)
        }
        Err(e) => {
            tracing::error!(
                "Lookup for '{}' failed, redirecting home: {:#}",
                short_path,
                e
            );
            found(home)
        }
    }
}

/// `/` and any path no other route matches - Redirect to the home page
pub async fn home_handler(State(state): State<AppState>) -> Response {
    found(&state.config.home_page_url)
}

// Stored URLs come from query strings and may hold bytes a header cannot carry.
fn found_or_home(location: &str, home: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => redirect_response(value),
        Err(_) => {
            tracing::warn!("Stored URL is not a valid Location header, redirecting home");
            found(home)
        }
    }
}

fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => redirect_response(value),
        // Config validates the home page URL at startup.
        Err(_) => StatusCode::FOUND.into_response(),
    }
}

fn redirect_response(location: HeaderValue) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, location),
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ),
        ],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{ALLOWED_IP, FailingStore, HOME, OTHER_IP, app_from};
    use crate::store::{LinkStore, MemoryLinkStore};
    use axum::{
        body::Body,
        http::{Request, Response},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn get(store: Arc<dyn LinkStore>, uri: &str) -> Response<Body> {
        app_from(store, OTHER_IP)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &Response<Body>) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .expect("Location header")
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_redirects_home() {
        let store = Arc::new(MemoryLinkStore::new());
        // A mapping keyed by the empty path must not shadow the home page
        store.create("", "http://elsewhere.example").await.unwrap();

        let response = get(store, "/").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), HOME);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_root_redirects_home_even_when_store_is_down() {
        let response = get(Arc::new(FailingStore), "/").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), HOME);
    }

    #[tokio::test]
    async fn test_unknown_path_redirects_home() {
        let response = get(Arc::new(MemoryLinkStore::new()), "/missing").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), HOME);
    }

    #[tokio::test]
    async fn test_known_path_redirects_to_long_url() {
        let store = Arc::new(MemoryLinkStore::new());
        store
            .create("docs", "https://example.com/some/long/page?x=1")
            .await
            .unwrap();

        let response = get(store, "/docs").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "https://example.com/some/long/page?x=1");
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_query_string_is_not_part_of_the_key() {
        let store = Arc::new(MemoryLinkStore::new());
        store.create("docs", "https://example.com/").await.unwrap();

        let response = get(store, "/docs?utm_source=mail").await;

        assert_eq!(location(&response), "https://example.com/");
    }

    #[tokio::test]
    async fn test_any_method_redirects() {
        let store = Arc::new(MemoryLinkStore::new());
        store.create("docs", "https://example.com/").await.unwrap();

        let response = app_from(store, ALLOWED_IP)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/docs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "https://example.com/");
    }

    #[tokio::test]
    async fn test_store_failure_redirects_home() {
        let response = get(Arc::new(FailingStore), "/docs").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), HOME);
    }

    #[tokio::test]
    async fn test_encoded_path_is_decoded_before_lookup() {
        let store = Arc::new(MemoryLinkStore::new());
        store.create("my link", "http://spaced.example").await.unwrap();
        store.create("100%", "http://percent.example").await.unwrap();

        let response = get(store.clone(), "/my%20link").await;
        assert_eq!(location(&response), "http://spaced.example");

        let response = get(store, "/100%25").await;
        assert_eq!(location(&response), "http://percent.example");
    }

    #[tokio::test]
    async fn test_nested_path_is_one_key() {
        let store = Arc::new(MemoryLinkStore::new());
        store.create("team/docs", "http://nested.example").await.unwrap();

        let response = get(store, "/team/docs").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "http://nested.example");
    }

    #[tokio::test]
    async fn test_path_that_is_not_utf8_redirects_home() {
        let response = get(Arc::new(MemoryLinkStore::new()), "/%FF%FE").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), HOME);
    }

    #[tokio::test]
    async fn test_unusable_stored_url_redirects_home() {
        let store = Arc::new(MemoryLinkStore::new());
        store.create("bad1", "http://a.example/\nx").await.unwrap();

        let response = get(store, "/bad1").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), HOME);
    }
}
