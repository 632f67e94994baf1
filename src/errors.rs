use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("directory error: {0}")]
    Directory(anyhow::Error),

    #[error("unknown inbox: {0}")]
    UnknownInbox(String),

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("mail delivery error: {0}")]
    Mail(anyhow::Error),

    #[error("contract violation: {0}")]
    ContractViolation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Directory(_) => StatusCode::BAD_GATEWAY,
            AppError::UnknownInbox(_) => StatusCode::NOT_FOUND,
            AppError::UnknownUser(_) => StatusCode::NOT_FOUND,
            AppError::Mail(_) => StatusCode::BAD_GATEWAY,
            AppError::ContractViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
