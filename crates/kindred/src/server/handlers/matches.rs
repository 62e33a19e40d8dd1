//! Nearest-neighbor and connection proposal handlers

use axum::{
  extract::{rejection::QueryRejection, Extension, Path, Query, State},
  response::Json,
};
use tracing::info;

use super::{bad_request, error_response, HandlerResult};
use crate::config::validate_threshold;
use crate::error::MatchError;
use crate::models::UserId;
use crate::server::middleware::RequestContext;
use crate::server::state::AppState;
use crate::server::types::{
  BaseResponse, CandidateData, ConnectionResponse, GroupResponse, MatchesQuery, MatchesResponse,
};

/// GET /matches/{user_id} - Nearest other users inside the threshold
pub async fn get_matches(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Path(user_id): Path<UserId>,
  query: Result<Query<MatchesQuery>, QueryRejection>,
) -> HandlerResult<MatchesResponse> {
  let transaction_id = context.request_id;
  let Query(query) = query.map_err(|e| bad_request(&e.body_text(), transaction_id))?;

  let settings = state.matcher.settings();
  let k = query.k.unwrap_or(settings.group_k);
  let threshold = query.threshold.unwrap_or(settings.group_threshold);
  validate_threshold("threshold", threshold)
    .map_err(|e| bad_request(&e.to_string(), transaction_id))?;

  let candidates = state
    .matcher
    .find_nearest(user_id, k, threshold)
    .await
    .map_err(|e| error_response(&e, transaction_id))?;

  let response = MatchesResponse {
    user_id,
    count: candidates.len(),
    candidates: candidates.into_iter().map(CandidateData::from).collect(),
  };
  Ok(Json(BaseResponse::success(response, transaction_id)))
}

/// POST /find_friend/{user_id} - Suggest a pair connection
pub async fn find_friend(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Path(user_id): Path<UserId>,
) -> HandlerResult<ConnectionResponse> {
  let transaction_id = context.request_id;

  let connection = state
    .matcher
    .propose_pair(user_id)
    .await
    .map_err(|e| error_response(&e, transaction_id))?;

  Ok(Json(BaseResponse::success(ConnectionResponse { connection }, transaction_id)))
}

/// POST /find_groups/{user_id} - Suggest a group connection
pub async fn find_groups(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Path(user_id): Path<UserId>,
) -> HandlerResult<GroupResponse> {
  let transaction_id = context.request_id;

  let response = match state.matcher.propose_group(user_id).await {
    Ok(connection) => GroupResponse {
      matched: true,
      found: connection.matched_ids.len(),
      connection: Some(connection),
    },
    Err(MatchError::InsufficientCandidates { found, required }) => {
      info!(user_id, found, required, "No group formed");
      GroupResponse { matched: false, found, connection: None }
    }
    Err(e) => return Err(error_response(&e, transaction_id)),
  };

  Ok(Json(BaseResponse::success(response, transaction_id)))
}
