use safepost_types::DetectionResult;
use serde::Deserialize;

use crate::InferError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Strict mirror of the response schema: a missing required key is an error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelVerdict {
    safe: bool,
    message: String,
    reasoning: String,
    emails: bool,
    address: bool,
    phone_numbers: bool,
    license_plates: bool,
    #[serde(default)]
    redaction_suggestions: Option<Vec<String>>,
}

/// Text of the first candidate's first text part.
pub fn extract_text(response: &GenerateContentResponse) -> Result<&str, InferError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        tracing::warn!(block_reason = reason, "prompt blocked by model");
        return Err(InferError::EmptyResponse);
    }
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|content| content.parts.iter().find_map(|p| p.text.as_deref()))
        .filter(|text| !text.trim().is_empty())
        .ok_or(InferError::EmptyResponse)
}

/// Parses the model's JSON reply. Fields pass through verbatim; only a
/// missing suggestions list is defaulted.
pub fn normalize(raw: &str) -> Result<DetectionResult, InferError> {
    let verdict: ModelVerdict = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| InferError::Malformed(e.to_string()))?;
    Ok(DetectionResult {
        safe: verdict.safe,
        message: verdict.message,
        reasoning: verdict.reasoning,
        emails: verdict.emails,
        address: verdict.address,
        phone_numbers: verdict.phone_numbers,
        license_plates: verdict.license_plates,
        redaction_suggestions: verdict.redaction_suggestions.unwrap_or_default(),
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
