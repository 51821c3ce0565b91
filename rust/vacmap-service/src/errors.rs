use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vacmap_core::codec::{ErrorCode, MapError, MapPackage, PathPackage};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("map unavailable: {1}")]
    Map(ErrorCode, String),
    #[error("path unavailable: {1}")]
    Path(ErrorCode, String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: MapError,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Map(code, detail) => (StatusCode::NOT_FOUND, Json(MapPackage::error(code, detail))).into_response(),
            AppError::Path(code, detail) => (StatusCode::NOT_FOUND, Json(PathPackage::error(code, detail))).into_response(),
            AppError::Internal(e) => {
                let body = ErrorBody { error: MapError::new(ErrorCode::Unknown, e.to_string()) };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
