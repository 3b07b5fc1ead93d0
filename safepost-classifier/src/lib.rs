use safepost_types::{DetectionResult, PiiCategory};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Safe,
    Unsafe,
    /// Analysis did not complete; nothing is known about the image.
    Unknown,
}

impl Verdict {
    /// Verdict as reported by the model's `safe` field.
    pub fn of(result: &DetectionResult) -> Self {
        if result.safe {
            Verdict::Safe
        } else {
            Verdict::Unsafe
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Consistency {
    Consistent,
    /// `safe` disagrees with the category flags.
    Mismatch {
        reported_safe: bool,
        flagged: Vec<PiiCategory>,
    },
}

pub fn flagged_categories(result: &DetectionResult) -> Vec<PiiCategory> {
    PiiCategory::ALL
        .into_iter()
        .filter(|c| result.flag(*c))
        .collect()
}

/// Checks `safe == !(any flag)`. Never modifies the result.
pub fn check_consistency(result: &DetectionResult) -> Consistency {
    let flagged = flagged_categories(result);
    if result.safe == flagged.is_empty() {
        Consistency::Consistent
    } else {
        Consistency::Mismatch {
            reported_safe: result.safe,
            flagged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_with_no_flags_is_consistent() {
        let result = DetectionResult {
            safe: true,
            ..Default::default()
        };
        assert_eq!(check_consistency(&result), Consistency::Consistent);
        assert_eq!(Verdict::of(&result), Verdict::Safe);
    }

    #[test]
    fn safe_with_flag_is_mismatch() {
        let result = DetectionResult {
            safe: true,
            license_plates: true,
            ..Default::default()
        };
        assert_eq!(
            check_consistency(&result),
            Consistency::Mismatch {
                reported_safe: true,
                flagged: vec![PiiCategory::LicensePlates],
            }
        );
    }

    #[test]
    fn fallback_shape_is_flagged_as_mismatch() {
        let result = DetectionResult::fallback();
        assert!(matches!(
            check_consistency(&result),
            Consistency::Mismatch { reported_safe: false, ref flagged } if flagged.is_empty()
        ));
    }

    #[test]
    fn flagged_categories_keep_wire_order() {
        let result = DetectionResult {
            license_plates: true,
            emails: true,
            ..Default::default()
        };
        assert_eq!(
            flagged_categories(&result),
            vec![PiiCategory::Emails, PiiCategory::LicensePlates]
        );
    }
}
