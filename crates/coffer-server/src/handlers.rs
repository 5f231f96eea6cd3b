//! Request handlers for the file and item endpoints.

use std::io;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::TryStreamExt;
use serde_json::error::Category;
use serde_json::{json, Value};
use tokio_util::io::{ReaderStream, StreamReader};

use coffer_core::{Error, FileName, Item, ItemId};

use crate::error::ApiError;
use crate::server::AppState;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Returns the `Content-Type` header and its essence, if one was sent.
fn content_type(headers: &HeaderMap) -> Option<(&str, &str)> {
    let value = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next().unwrap_or_default().trim();
    Some((value, essence))
}

// === Files ===

pub(crate) async fn put_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Value>, ApiError> {
    let name = FileName::new(filename)?;

    if let Some((value, essence)) = content_type(&headers) {
        if essence.eq_ignore_ascii_case(FORM_URLENCODED) {
            return Err(Error::UnsupportedMediaType {
                content_type: value.to_string(),
            }
            .into());
        }
    }

    let stream = body.into_data_stream().map_err(io::Error::other);
    let reader = StreamReader::new(stream);
    tokio::pin!(reader);

    let bytes = state.files.write(&name, reader).await?;
    tracing::info!(file = %name, bytes, "File uploaded");

    Ok(Json(json!({ "filename": name })))
}

pub(crate) async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let names = state.files.list().await?;
    Ok(Json(json!({ "file": names })))
}

pub(crate) async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let name = FileName::new(filename)?;
    let opened = state.files.open(&name).await?;

    let mime = mime_guess::from_path(name.as_str()).first_or_octet_stream();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(opened.len));
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(&name));

    tracing::debug!(file = %name, size = opened.len, "Serving file");
    let body = Body::from_stream(ReaderStream::new(opened.file));
    Ok((StatusCode::OK, headers, body).into_response())
}

pub(crate) async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let name = FileName::new(filename)?;

    match state.files.delete(&name).await {
        Ok(()) => {
            tracing::info!(file = %name, "File removed");
            Ok((StatusCode::OK, Json(json!({ "removed": true }))).into_response())
        },
        Err(e) if e.is_not_found() => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "removed": false, "error": e.to_string() })),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// Builds an `attachment` disposition carrying the original name.
///
/// Names that are not plain printable ASCII are sent in the RFC 5987
/// `filename*` form.
fn content_disposition(name: &FileName) -> HeaderValue {
    let raw = name.as_str();
    let plain = raw
        .bytes()
        .all(|b| (b.is_ascii_graphic() && b != b'"' && b != b'\\') || b == b' ');

    let value = if plain {
        format!("attachment; filename=\"{raw}\"")
    } else {
        format!("attachment; filename*=UTF-8''{}", urlencoding::encode(raw))
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

// === Items ===

pub(crate) async fn get_item(
    State(state): State<Arc<AppState>>,
    id: Result<Path<ItemId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;

    // Absence is reported as empty data with a 200, not as a 404.
    let data = match state.items.get(id).await? {
        Some(item) => serde_json::to_value(item).map_err(Error::from)?,
        None => json!({}),
    };

    Ok(Json(json!({ "code": 0, "data": data })))
}

pub(crate) async fn put_item(
    State(state): State<Arc<AppState>>,
    id: Result<Path<ItemId>, PathRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    let item = parse_item(&headers, &body)?;
    let name = item.name.clone();

    state.items.put(id, item).await?;
    tracing::info!(id, name = %name, "Item stored");

    Ok(Json(json!({ "id": id, "name": name })))
}

/// Decodes an item body. A missing `Content-Type` is read as JSON.
fn parse_item(headers: &HeaderMap, body: &[u8]) -> Result<Item, ApiError> {
    if let Some((value, essence)) = content_type(headers) {
        if !is_json(essence) {
            return Err(Error::UnsupportedMediaType {
                content_type: value.to_string(),
            }
            .into());
        }
    }

    serde_json::from_slice(body).map_err(|e| {
        let status = match e.classify() {
            Category::Data => StatusCode::UNPROCESSABLE_ENTITY,
            Category::Syntax | Category::Eof | Category::Io => StatusCode::BAD_REQUEST,
        };
        ApiError::new(status, format!("Invalid item body: {e}"), "invalid_request_error")
    })
}

fn is_json(essence: &str) -> bool {
    let essence = essence.to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}
