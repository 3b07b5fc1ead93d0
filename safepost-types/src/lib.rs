use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The four PII categories the detection model is asked about.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PiiCategory {
    Emails,
    Address,
    PhoneNumbers,
    LicensePlates,
}

impl PiiCategory {
    /// All categories, in wire order.
    pub const ALL: [PiiCategory; 4] = [
        PiiCategory::Emails,
        PiiCategory::Address,
        PiiCategory::PhoneNumbers,
        PiiCategory::LicensePlates,
    ];

    /// JSON key used for this category's flag.
    pub fn key(self) -> &'static str {
        match self {
            PiiCategory::Emails => "emails",
            PiiCategory::Address => "address",
            PiiCategory::PhoneNumbers => "phoneNumbers",
            PiiCategory::LicensePlates => "licensePlates",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PiiCategory::Emails => "Email Addresses",
            PiiCategory::Address => "Addresses",
            PiiCategory::PhoneNumbers => "Phone Numbers",
            PiiCategory::LicensePlates => "License Plates",
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Verdict returned for one analyzed image.
///
/// Every field is set by the detection model. `safe` is expected to equal
/// "no category flagged" but is carried as reported, never re-derived.
/// Missing fields deserialize to their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionResult {
    pub safe: bool,
    pub message: String,
    pub reasoning: String,
    pub emails: bool,
    pub address: bool,
    pub phone_numbers: bool,
    pub license_plates: bool,
    /// Empty when `safe`; otherwise hints in the order the model gave them.
    pub redaction_suggestions: Vec<String>,
}

impl DetectionResult {
    /// Fixed shape returned whenever analysis could not complete.
    pub fn fallback() -> Self {
        Self {
            safe: false,
            message: "Error analyzing image".into(),
            reasoning: "The image could not be analyzed. Please try again.".into(),
            emails: false,
            address: false,
            phone_numbers: false,
            license_plates: false,
            redaction_suggestions: Vec::new(),
        }
    }

    pub fn flag(&self, category: PiiCategory) -> bool {
        match category {
            PiiCategory::Emails => self.emails,
            PiiCategory::Address => self.address,
            PiiCategory::PhoneNumbers => self.phone_numbers,
            PiiCategory::LicensePlates => self.license_plates,
        }
    }

    pub fn set_flag(&mut self, category: PiiCategory, value: bool) {
        match category {
            PiiCategory::Emails => self.emails = value,
            PiiCategory::Address => self.address = value,
            PiiCategory::PhoneNumbers => self.phone_numbers = value,
            PiiCategory::LicensePlates => self.license_plates = value,
        }
    }

    pub fn any_flagged(&self) -> bool {
        PiiCategory::ALL.iter().any(|c| self.flag(*c))
    }

    /// Best-effort read of a client-echoed result. Missing or wrongly typed
    /// fields take their defaults; non-string suggestions are dropped.
    pub fn from_value(value: &Value) -> Self {
        let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            safe: flag("safe"),
            message: text("message"),
            reasoning: text("reasoning"),
            emails: flag(PiiCategory::Emails.key()),
            address: flag(PiiCategory::Address.key()),
            phone_numbers: flag(PiiCategory::PhoneNumbers.key()),
            license_plates: flag(PiiCategory::LicensePlates.key()),
            redaction_suggestions: value
                .get("redactionSuggestions")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// A user's "this verdict is wrong" signal. Never rejected for its content:
/// any JSON value reads as some report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default, deserialize_with = "lenient_result")]
    pub result: DetectionResult,
    /// ISO-8601 timestamp supplied by the client. Not validated.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: String,
}

impl Report {
    pub fn from_value(value: &Value) -> Self {
        Self {
            result: value
                .get("result")
                .map(DetectionResult::from_value)
                .unwrap_or_default(),
            timestamp: value.get("timestamp").map(timestamp_text).unwrap_or_default(),
        }
    }
}

fn timestamp_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_result<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DetectionResult, D::Error> {
    Value::deserialize(deserializer).map(|v| DetectionResult::from_value(&v))
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Value::deserialize(deserializer).map(|v| timestamp_text(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_keys() {
        let mut result = DetectionResult::default();
        result.set_flag(PiiCategory::PhoneNumbers, true);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["phoneNumbers"], true);
        assert_eq!(json["licensePlates"], false);
        assert!(json["redactionSuggestions"].as_array().unwrap().is_empty());
        for category in PiiCategory::ALL {
            assert!(json.get(category.key()).is_some(), "missing {category}");
        }
    }

    #[test]
    fn fallback_is_unsafe_with_no_flags() {
        let fallback = DetectionResult::fallback();
        assert!(!fallback.safe);
        assert!(!fallback.any_flagged());
        assert!(fallback.redaction_suggestions.is_empty());
    }

    #[test]
    fn report_accepts_partial_result() {
        let report: Report =
            serde_json::from_str(r#"{"result":{"safe":false},"timestamp":"2025-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(!report.result.safe);
        assert_eq!(report.result.message, "");
        assert_eq!(report.timestamp, "2025-01-01T00:00:00Z");
    }

    #[test]
    fn report_tolerates_wrongly_typed_fields() {
        let report: Report = serde_json::from_str(
            r#"{"result":{"safe":"no","message":null,"emails":true,
                "redactionSuggestions":["Blur it", 3, null]},"timestamp":1735689600}"#,
        )
        .unwrap();
        assert!(!report.result.safe);
        assert!(report.result.emails);
        assert_eq!(report.result.message, "");
        assert_eq!(report.result.redaction_suggestions, vec!["Blur it".to_string()]);
        assert_eq!(report.timestamp, "1735689600");
    }

    #[test]
    fn report_from_any_json_value() {
        let null_result = Report::from_value(&serde_json::json!({ "result": null }));
        assert_eq!(null_result.result, DetectionResult::default());
        assert_eq!(null_result.timestamp, "");

        let not_an_object = Report::from_value(&serde_json::json!([1, 2, 3]));
        assert_eq!(not_an_object, Report::default());
    }
}
