//! Insight generation handler

use axum::{
  extract::{Extension, Path, State},
  response::Json,
};

use super::{error_response, HandlerResult};
use crate::models::UserId;
use crate::server::middleware::RequestContext;
use crate::server::state::AppState;
use crate::server::types::{BaseResponse, InsightResponse};

/// POST /add_ai_insight/{user_id} - Summarize recent journals into a new insight
pub async fn add_ai_insight(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Path(user_id): Path<UserId>,
) -> HandlerResult<InsightResponse> {
  let generated = state
    .pipeline
    .refresh(user_id)
    .await
    .map_err(|e| error_response(&e, context.request_id))?;

  Ok(Json(BaseResponse::success(InsightResponse::from(generated), context.request_id)))
}
