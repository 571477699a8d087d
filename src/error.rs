use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error parsing response")]
    MalformedPayload,

    #[error("No consent")]
    NoConsent,

    #[error("Invalid answer")]
    InvalidAnswer,

    #[error("Error encoding session")]
    SessionEncode,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload | AppError::NoConsent | AppError::InvalidAnswer => {
                StatusCode::BAD_REQUEST
            }
            AppError::SessionEncode => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
