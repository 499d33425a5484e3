//! Sistema de manejo de errores
//!
//! Este módulo define los errores de los comandos de jornada y del cliente
//! remoto, y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errores del sistema de registro remoto
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("System of record unavailable: {0}")]
    Unavailable(String),

    #[error("System of record rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response from system of record: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Un rechazo explícito no se resuelve reintentando
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RemoteError::Rejected { .. })
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::InvalidResponse(e.to_string())
        } else {
            RemoteError::Unavailable(e.to_string())
        }
    }
}

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),

    #[error("Journey start already in flight for driver '{0}'")]
    StartInFlight(String),

    #[error("Journey end already in flight for driver '{0}'")]
    EndInFlight(String),

    #[error("Journey state changed while waiting: {0}")]
    StateChanged(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    code: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error", "VALIDATION_ERROR"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "Invalid Request", "INVALID_REQUEST"),
            AppError::StartInFlight(_) => (StatusCode::CONFLICT, "Conflict", "START_IN_FLIGHT"),
            AppError::EndInFlight(_) => (StatusCode::CONFLICT, "Conflict", "END_IN_FLIGHT"),
            AppError::StateChanged(_) => (StatusCode::CONFLICT, "Conflict", "STATE_CHANGED"),
            AppError::Remote(RemoteError::Rejected { .. }) => {
                (StatusCode::BAD_GATEWAY, "External API Error", "REMOTE_REJECTED")
            }
            AppError::Remote(RemoteError::InvalidResponse(_)) => {
                (StatusCode::BAD_GATEWAY, "External API Error", "REMOTE_INVALID_RESPONSE")
            }
            AppError::Remote(RemoteError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable", "REMOTE_UNAVAILABLE")
            }
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Store Error", "STORE_ERROR"),
            AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!("❌ {}: {}", code, self);
        } else {
            tracing::warn!("⚠️ {}: {}", code, self);
        }

        let body = ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación
pub fn validation_error(field: &str, message: &str) -> AppError {
    AppError::Validation(format!("{}: {}", field, message))
}
