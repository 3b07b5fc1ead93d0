//! Request body for Gemini's `generateContent`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::{json, Value};

pub const DETECTION_PROMPT: &str = "\
You are a privacy reviewer. Decide whether this image is safe to post publicly.

Check the image for exactly these four kinds of personally identifiable information:
1. emails: any email address, complete or partial.
2. address: any physical or mailing address, including street names with house numbers.
3. phoneNumbers: any phone or fax number, in any format.
4. licensePlates: any readable vehicle license plate.

Be strict. If you are unsure whether something belongs to one of these categories, flag it.
Ignore the contents of QR codes; do not decode them and do not flag them.
Anything outside the four categories does not make the image unsafe.

Set safe to true only if none of the four categories is present.
Give a short summary in message and exactly one sentence explaining your decision in reasoning.
When the image is not safe, list short, actionable redaction steps in redactionSuggestions \
(for example \"Blur the phone number in the top-right corner\"). When it is safe, leave \
redactionSuggestions empty.";

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Clone, Debug, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    InlineData(Blob),
    Text(String),
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64, standard alphabet.
    pub data: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

/// Wraps the image and the fixed instructions into a single user turn and
/// pins the reply to `response_schema()`.
pub fn build_request(image: &[u8], mime_type: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user".into(),
            parts: vec![
                Part::InlineData(Blob {
                    mime_type: mime_type.to_string(),
                    data: STANDARD.encode(image),
                }),
                Part::Text(DETECTION_PROMPT.into()),
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".into(),
            response_schema: response_schema(),
        },
    }
}

/// Every field except `redactionSuggestions` is required.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "safe": { "type": "BOOLEAN" },
            "message": { "type": "STRING" },
            "reasoning": { "type": "STRING" },
            "emails": { "type": "BOOLEAN" },
            "address": { "type": "BOOLEAN" },
            "phoneNumbers": { "type": "BOOLEAN" },
            "licensePlates": { "type": "BOOLEAN" },
            "redactionSuggestions": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": [
            "safe",
            "message",
            "reasoning",
            "emails",
            "address",
            "phoneNumbers",
            "licensePlates"
        ],
        "propertyOrdering": [
            "safe",
            "message",
            "reasoning",
            "emails",
            "address",
            "phoneNumbers",
            "licensePlates",
            "redactionSuggestions"
        ]
    })
}
