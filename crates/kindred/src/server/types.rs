//! REST API types with schemars annotations for OpenAPI generation

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MatchError;
use crate::models::{Candidate, Connection, UserId};
use crate::pipeline::GeneratedInsight;

// Base Response Structure
// ======================

/// Base response object for all API endpoints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BaseResponse<T> {
  /// API versioning information
  pub versioning: VersionInfo,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  /// Optional error information
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub errors: Vec<ApiError>,

  /// Response data (generic for different endpoint types)
  #[serde(flatten)]
  pub data: T,
}

/// API versioning information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionInfo {
  pub latest: String,
  pub requested: String,
  pub resolved: String,
}

/// API error information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
  /// Error key, unique to the error source
  pub key: String,

  /// Human readable error message
  pub message: String,

  /// Additional error context
  #[serde(default)]
  pub context: serde_json::Value,
}

// Status/Version Endpoints
// =======================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  pub version: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  pub status: String,
  pub version: String,
  /// Store backend serving requests (`lancedb` or `memory`)
  pub backend: String,
}

// Matching Endpoints
// ==================

/// Query string for GET /matches/{user_id}
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct MatchesQuery {
  /// Maximum number of candidates; defaults to the group setting
  pub k: Option<usize>,

  /// Exclusive distance cutoff; defaults to the group setting
  pub threshold: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CandidateData {
  pub user_id: UserId,
  pub insight_text: String,
  pub distance: f32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MatchesResponse {
  pub user_id: UserId,
  pub candidates: Vec<CandidateData>,
  pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ConnectionResponse {
  pub connection: Connection,
}

/// Response for POST /find_groups/{user_id}
///
/// Too few nearby users is an ordinary outcome, reported with `matched: false`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GroupResponse {
  pub matched: bool,

  /// Candidates found inside the group threshold
  pub found: usize,

  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub connection: Option<Connection>,
}

// Insight Endpoints
// =================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct InsightResponse {
  pub user_id: UserId,
  pub insight: String,
  pub keywords: Vec<String>,
  pub entries_used: usize,
  pub created_at: DateTime<Utc>,
}

// Helper Functions
// ================

impl<T> BaseResponse<T> {
  /// Create a successful response
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    Self { versioning: VersionInfo::current(), transaction_id, errors: Vec::new(), data }
  }

  /// Create an error response
  pub fn error(errors: Vec<ApiError>, transaction_id: Uuid) -> BaseResponse<()> {
    BaseResponse { versioning: VersionInfo::current(), transaction_id, errors, data: () }
  }
}

impl VersionInfo {
  fn current() -> Self {
    let version = env!("CARGO_PKG_VERSION");
    Self {
      latest: version.to_string(),
      requested: version.to_string(),
      resolved: version.to_string(),
    }
  }
}

impl From<&MatchError> for ApiError {
  fn from(error: &MatchError) -> Self {
    let context = match error {
      MatchError::InsufficientCandidates { found, required } => {
        serde_json::json!({ "found": found, "required": required })
      }
      MatchError::UpstreamFailure { provider, .. } => serde_json::json!({ "provider": provider }),
      _ => serde_json::Value::Null,
    };
    Self { key: error.key().to_string(), message: error.to_string(), context }
  }
}

impl From<Candidate> for CandidateData {
  fn from(candidate: Candidate) -> Self {
    Self {
      user_id: candidate.user_id,
      insight_text: candidate.insight_text,
      distance: candidate.distance,
    }
  }
}

impl From<GeneratedInsight> for InsightResponse {
  fn from(generated: GeneratedInsight) -> Self {
    Self {
      user_id: generated.insight.user_id,
      insight: generated.insight.text,
      keywords: generated.keywords,
      entries_used: generated.entries_used,
      created_at: generated.insight.created_at,
    }
  }
}
