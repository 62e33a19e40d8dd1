//! Connection lookup and acceptance handlers

use axum::{
  extract::{Extension, Path, State},
  response::Json,
};
use uuid::Uuid;

use super::{error_response, HandlerResult};
use crate::lifecycle;
use crate::server::middleware::RequestContext;
use crate::server::state::AppState;
use crate::server::types::{BaseResponse, ConnectionResponse};

/// GET /connections/{id}
pub async fn get_connection(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Path(id): Path<Uuid>,
) -> HandlerResult<ConnectionResponse> {
  let connection = lifecycle::fetch(state.connections.as_ref(), id)
    .await
    .map_err(|e| error_response(&e, context.request_id))?;

  Ok(Json(BaseResponse::success(ConnectionResponse { connection }, context.request_id)))
}

/// POST /connections/{id}/accept - Idempotent acceptance
pub async fn accept_connection(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Path(id): Path<Uuid>,
) -> HandlerResult<ConnectionResponse> {
  let connection = lifecycle::accept(state.connections.as_ref(), id)
    .await
    .map_err(|e| error_response(&e, context.request_id))?;

  Ok(Json(BaseResponse::success(ConnectionResponse { connection }, context.request_id)))
}
