//! Spreadsheet import endpoints

use std::{collections::HashMap, convert::Infallible};

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::{ImportEvent, ImportHistoryEntry, ImportOptions, ImportPreview},
    AppState,
};

use super::AuthenticatedUser;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Multipart form accepted by the import endpoint
#[allow(dead_code)]
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct GoodreadsImportForm {
    /// CSV export, at most 10 MiB by default
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub preview_only: Option<bool>,
    pub skip_duplicates: Option<bool>,
    pub create_collections: Option<bool>,
    pub enrich_from_external_source: Option<bool>,
    pub fast_mode: Option<bool>,
    /// JSON array of row indices
    pub selected_indices: Option<String>,
    /// JSON object mapping row index to book metadata
    pub manually_selected_books: Option<String>,
}

/// Import history query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Number of entries to return (default 10, at most 100)
    pub limit: Option<i64>,
}

/// Import a Goodreads-style CSV export
///
/// With `previewOnly` the normalized rows are returned as JSON and nothing is
/// written. Otherwise the response is a stream of newline-delimited JSON
/// events: one `progress` event per row, then a final `complete` or `error`.
#[utoipa::path(
    post,
    path = "/imports/goodreads",
    tag = "imports",
    security(("bearer_auth" = [])),
    request_body(content = GoodreadsImportForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Preview as JSON, or the NDJSON progress stream",
            content(
                ("application/json" = ImportPreview),
                ("application/x-ndjson" = String)
            )
        ),
        (status = 400, description = "Invalid file, options, or no valid rows", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn import_goodreads(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Could not read uploaded file: {}", e)))?;
            upload = Some((file_name, bytes.to_vec()));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Could not read field {}: {}", name, e)))?;
            fields.insert(name, value);
        }
    }

    let (file_name, bytes) = upload.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;
    let imports = state.services.imports.clone();
    let text = imports.validate_upload(&file_name, &bytes)?;
    let options = ImportOptions::from_form_fields(&fields)?;

    if options.preview_only {
        let preview = imports.preview(&text, &options)?;
        tracing::info!(user_id = claims.user_id, rows = preview.candidates.len(), "Import preview");
        return Ok(Json(preview).into_response());
    }

    let prepared = imports.prepare(&text, &options)?;
    let user_id = claims.user_id;
    let (tx, rx) = mpsc::channel::<ImportEvent>(imports.config().event_buffer.max(1));

    tokio::spawn(async move {
        imports.execute(user_id, &file_name, prepared, &options, tx).await;
    });

    let stream = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(event.to_ndjson_line()));
    Ok((
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// List recent import runs, most recent first
#[utoipa::path(
    get,
    path = "/imports/history",
    tag = "imports",
    security(("bearer_auth" = [])),
    params(HistoryQuery),
    responses(
        (status = 200, description = "Import history", body = Vec<ImportHistoryEntry>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn import_history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<ImportHistoryEntry>>> {
    let entries = state
        .services
        .imports
        .list_history(claims.user_id, query.limit)
        .await?;
    Ok(Json(entries))
}
