//! Group label prompt and reply parsing

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Candidate;

static LABEL_PATTERN: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#"NAME:\s*"([^"]+)""#).expect("label pattern is a valid regex"));

/// Prompt asking the generator to name a group formed around `user_insight`
pub fn group_prompt(user_insight: &str, candidates: &[Candidate]) -> String {
  let mut prompt = String::from(
    "The following journal insights belong to people who are going through similar things.\n\n",
  );

  prompt.push_str("Original insight:\n");
  prompt.push_str(user_insight.trim());
  prompt.push_str("\n\nMatched insights:\n");

  for (index, candidate) in candidates.iter().enumerate() {
    prompt.push_str(&format!("{}. {}\n", index + 1, candidate.insight_text.trim()));
  }

  prompt.push_str(
    "\nSuggest a short, warm name for a peer support group that brings these people together. \
     Do not include personal details. Reply with exactly one line in the form NAME: \"<group name>\".",
  );
  prompt
}

/// Pull the quoted label out of a `NAME: "..."` reply
pub fn extract_label(response: &str) -> Option<String> {
  LABEL_PATTERN
    .captures(response)
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str().trim().to_string())
    .filter(|label| !label.is_empty())
}

/// Extracted label, or `default` when the reply does not follow the pattern
pub fn label_or_default(response: &str, default: &str) -> String {
  extract_label(response).unwrap_or_else(|| default.to_string())
}
