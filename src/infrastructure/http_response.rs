// HTTP response utilities for JSON+Brotli encoding
use crate::domain::error::ForecastError;
use async_compression::tokio::bufread::BrotliEncoder;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
};
use serde::Serialize;
use tokio::io::AsyncReadExt;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// True when the client advertises Brotli in `Accept-Encoding`
pub fn accepts_brotli(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.contains("br"))
        .unwrap_or(false)
}

/// Serialize `data` to JSON and optionally compress it with Brotli
pub async fn json_response<T: Serialize>(
    data: &T,
    compress: bool,
) -> Result<Response<Body>, StatusCode> {
    json_response_with_status(StatusCode::OK, data, compress).await
}

pub async fn json_response_with_status<T: Serialize>(
    status: StatusCode,
    data: &T,
    compress: bool,
) -> Result<Response<Body>, StatusCode> {
    let json_bytes = serde_json::to_vec(data).map_err(|e| {
        tracing::error!("JSON serialization error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let (body_bytes, content_encoding) = if compress {
        let original = json_bytes.len();
        let cursor = std::io::Cursor::new(json_bytes);
        let mut encoder = BrotliEncoder::new(cursor);
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).await.map_err(|e| {
            tracing::error!("Brotli compression error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        tracing::trace!("Compressed: {} -> {} bytes", original, compressed.len());
        (compressed, Some("br"))
    } else {
        (json_bytes, None)
    };

    let mut response_builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, HeaderValue::from(body_bytes.len()));

    if let Some(encoding) = content_encoding {
        response_builder = response_builder.header(header::CONTENT_ENCODING, encoding);
    }

    response_builder.body(Body::from(body_bytes)).map_err(|e| {
        tracing::error!("Response build error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

pub fn status_for(error: &ForecastError) -> StatusCode {
    match error {
        ForecastError::InvalidHorizon { .. }
        | ForecastError::UnknownGranularity(_)
        | ForecastError::UnknownMethod(_) => StatusCode::BAD_REQUEST,
        ForecastError::InsufficientHistory { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ForecastError::ModelLoadFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ForecastError::SchemaMismatch { .. } | ForecastError::Computation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `{"error": "..."}` body with the given status
pub async fn error_response(
    status: StatusCode,
    message: &str,
    compress: bool,
) -> Result<Response<Body>, StatusCode> {
    json_response_with_status(status, &ErrorBody { error: message }, compress).await
}

pub async fn forecast_error_response(
    error: &ForecastError,
    compress: bool,
) -> Result<Response<Body>, StatusCode> {
    let status = status_for(error);
    if status.is_server_error() {
        tracing::error!("{}", error);
    } else {
        tracing::debug!("Rejected request: {}", error);
    }
    error_response(status, &error.to_string(), compress).await
}
