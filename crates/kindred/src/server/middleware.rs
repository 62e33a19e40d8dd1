//! Request context middleware
//!
//! Assigns every request a UUID, logs its start and completion, and makes the
//! context available to handlers as an `Extension`.

use axum::{
  extract::Request,
  http::{Method, Uri},
  middleware::Next,
  response::Response,
};
use std::time::Instant;
use tracing::{info, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RequestContext {
  /// Unique ID for this request, echoed as the response `transaction_id`
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri }
  }
}

pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
  let context = RequestContext::new(request.method().clone(), request.uri().clone());
  let user_agent = request
    .headers()
    .get("user-agent")
    .and_then(|v| v.to_str().ok())
    .unwrap_or("none")
    .to_string();

  let span = tracing::info_span!(
    "request",
    request_id = %context.request_id,
    method = %context.method,
    path = %context.uri.path(),
  );

  request.extensions_mut().insert(context);

  async move {
    let start_time = Instant::now();
    info!(user_agent = %user_agent, "Request started");

    let response = next.run(request).await;

    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    info!(status = response.status().as_u16(), duration_ms, "Request completed");
    response
  }
  .instrument(span)
  .await
}
