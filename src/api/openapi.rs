//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, imports};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Readshelf API",
        version = "0.4.0",
        description = "Personal reading library server: spreadsheet import and normalization",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Imports
        imports::import_goodreads,
        imports::import_history,
    ),
    components(
        schemas(
            // Imports
            imports::GoodreadsImportForm,
            imports::HistoryQuery,
            crate::models::ImportPreview,
            crate::models::ImportResult,
            crate::models::import::ImportErrorEntry,
            crate::models::ImportHistoryEntry,
            crate::models::NormalizedCandidate,
            crate::models::ReadingStatus,
            crate::models::ParseDiagnostics,
            crate::models::import::RowDiagnostic,
            crate::models::BookMetadata,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "imports", description = "Reading-tracker spreadsheet import")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
