use utoipa::OpenApi;

use crate::error::{HealthResponse, UnhealthyResponse};
use crate::handlers;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "spanner-shortlink API",
        version = "0.1.0",
        description = "Short-link redirect service backed by Google Cloud Spanner"
    ),
    paths(
        handlers::health::health_handler,
        handlers::register::register_handler,
        handlers::redirect::redirect_handler
    ),
    components(schemas(HealthResponse, UnhealthyResponse)),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "register", description = "Short path registration"),
        (name = "redirect", description = "Short path resolution")
    )
)]
pub struct ApiDoc;
