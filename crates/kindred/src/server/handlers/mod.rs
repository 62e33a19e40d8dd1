//! Endpoint handlers and the shared error-to-response mapping

pub mod connections;
pub mod insights;
pub mod matches;
pub mod status;

use axum::{http::StatusCode, response::Json};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::MatchError;
use crate::server::types::{ApiError, BaseResponse};

pub type HandlerError = (StatusCode, Json<BaseResponse<()>>);
pub type HandlerResult<T> = Result<Json<BaseResponse<T>>, HandlerError>;

pub fn status_for(error: &MatchError) -> StatusCode {
  match error {
    MatchError::NotFound { .. }
    | MatchError::NoMatch { .. }
    | MatchError::ConnectionNotFound { .. }
    | MatchError::NoJournalEntries { .. } => StatusCode::NOT_FOUND,
    // Handlers that expect this one answer 200 before getting here
    MatchError::InsufficientCandidates { .. } => StatusCode::OK,
    MatchError::UpstreamFailure { .. } => StatusCode::BAD_GATEWAY,
    MatchError::StoreFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    MatchError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
  }
}

pub fn error_response(error: &MatchError, transaction_id: Uuid) -> HandlerError {
  let status = status_for(error);
  if status.is_server_error() {
    error!(error = %error, "Request failed");
  } else {
    info!(key = error.key(), "{error}");
  }

  (status, Json(BaseResponse::<()>::error(vec![ApiError::from(error)], transaction_id)))
}

pub fn bad_request(message: &str, transaction_id: Uuid) -> HandlerError {
  error_response(&MatchError::invalid(message), transaction_id)
}
