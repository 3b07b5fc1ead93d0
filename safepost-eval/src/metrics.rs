use safepost_types::{DetectionResult, PiiCategory};
use serde::Serialize;

use crate::{EvalRecord, Expected};

/// One scored axis. For `Safety` the positive class is "unsafe".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimension {
    Safety,
    Category(PiiCategory),
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Safety,
        Dimension::Category(PiiCategory::Emails),
        Dimension::Category(PiiCategory::Address),
        Dimension::Category(PiiCategory::PhoneNumbers),
        Dimension::Category(PiiCategory::LicensePlates),
    ];

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Safety => "Safe/Unsafe",
            Dimension::Category(c) => c.label(),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Dimension::Safety => "safe",
            Dimension::Category(c) => c.key(),
        }
    }

    /// Raw field value as the wire carries it (`safe`, or the category flag).
    pub fn expected(self, expected: &Expected) -> bool {
        match self {
            Dimension::Safety => expected.safe(),
            Dimension::Category(c) => expected.flag(c),
        }
    }

    pub fn actual(self, result: &DetectionResult) -> bool {
        match self {
            Dimension::Safety => result.safe,
            Dimension::Category(c) => result.flag(c),
        }
    }

    fn positive(self, value: bool) -> bool {
        match self {
            Dimension::Safety => !value,
            Dimension::Category(_) => value,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Confusion {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl Confusion {
    pub fn record(&mut self, expected_positive: bool, predicted_positive: bool) {
        match (expected_positive, predicted_positive) {
            (true, true) => self.tp += 1,
            (false, false) => self.tn += 1,
            (false, true) => self.fp += 1,
            (true, false) => self.fn_ += 1,
        }
    }

    pub fn scored(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Correct predictions over `total`, which includes failed cases.
    pub fn accuracy(&self, total: usize) -> f64 {
        ratio(self.tp + self.tn, total)
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }

    /// Wrong predictions over scored cases; failed cases are not counted.
    pub fn error_rate(&self) -> f64 {
        ratio(self.fp + self.fn_, self.scored())
    }

    /// `fp` over actual negatives.
    pub fn false_positive_rate(&self) -> f64 {
        ratio(self.fp, self.fp + self.tn)
    }

    /// `fn` over actual positives.
    pub fn false_negative_rate(&self) -> f64 {
        ratio(self.fn_, self.fn_ + self.tp)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub failed: usize,
    pub dimensions: Vec<(Dimension, Confusion)>,
}

impl Summary {
    /// Failed cases count toward `total` only.
    pub fn from_records(records: &[EvalRecord]) -> Self {
        let mut dimensions: Vec<(Dimension, Confusion)> = Dimension::ALL
            .iter()
            .map(|d| (*d, Confusion::default()))
            .collect();
        let mut failed = 0;
        for record in records {
            let Some(actual) = record.outcome.result() else {
                failed += 1;
                continue;
            };
            for (dimension, confusion) in dimensions.iter_mut() {
                confusion.record(
                    dimension.positive(dimension.expected(&record.case.expected)),
                    dimension.positive(dimension.actual(actual)),
                );
            }
        }
        Self {
            total: records.len(),
            failed,
            dimensions,
        }
    }

    pub fn get(&self, dimension: Dimension) -> Confusion {
        self.dimensions
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, c)| *c)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EvalCase, Outcome};

    fn record(category: PiiCategory, outcome: Outcome) -> EvalRecord {
        EvalRecord {
            case: EvalCase {
                image: "x.png".into(),
                folder: "f".into(),
                expected: Expected { category },
            },
            outcome,
        }
    }

    fn detected(safe: bool, flags: &[PiiCategory]) -> Outcome {
        let mut result = DetectionResult {
            safe,
            ..Default::default()
        };
        for c in flags {
            result.set_flag(*c, true);
        }
        Outcome::Detected(result)
    }

    #[test]
    fn zero_denominators_are_zero() {
        let c = Confusion::default();
        assert_eq!(c.accuracy(0), 0.0);
        assert_eq!(c.precision(), 0.0);
        assert_eq!(c.recall(), 0.0);
        assert_eq!(c.f1(), 0.0);
        assert_eq!(c.specificity(), 0.0);
    }

    #[test]
    fn metrics_from_counts() {
        let c = Confusion {
            tp: 6,
            tn: 2,
            fp: 2,
            fn_: 2,
        };
        assert!((c.precision() - 0.75).abs() < 1e-9);
        assert!((c.recall() - 0.75).abs() < 1e-9);
        assert!((c.f1() - 0.75).abs() < 1e-9);
        assert!((c.specificity() - 0.5).abs() < 1e-9);
        assert!((c.accuracy(16) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn error_rates_ignore_failed_cases() {
        let c = Confusion {
            tp: 3,
            tn: 4,
            fp: 1,
            fn_: 2,
        };
        assert!((c.error_rate() - 0.3).abs() < 1e-9);
        assert!((c.false_positive_rate() - 0.2).abs() < 1e-9);
        assert!((c.false_negative_rate() - 0.4).abs() < 1e-9);

        let empty = Confusion::default();
        assert_eq!(empty.error_rate(), 0.0);
        assert_eq!(empty.false_positive_rate(), 0.0);
        assert_eq!(empty.false_negative_rate(), 0.0);
    }

    #[test]
    fn summary_scores_safety_and_categories() {
        let records = vec![
            record(PiiCategory::Emails, detected(false, &[PiiCategory::Emails])),
            record(PiiCategory::Address, detected(true, &[])),
            record(PiiCategory::Address, detected(false, &[PiiCategory::PhoneNumbers])),
            record(PiiCategory::PhoneNumbers, Outcome::Failed("timeout".into())),
        ];
        let summary = Summary::from_records(&records);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.failed, 1);

        let safety = summary.get(Dimension::Safety);
        assert_eq!((safety.tp, safety.fn_, safety.fp, safety.tn), (2, 1, 0, 0));

        let address = summary.get(Dimension::Category(PiiCategory::Address));
        assert_eq!((address.tp, address.fn_, address.tn), (0, 2, 1));

        let phones = summary.get(Dimension::Category(PiiCategory::PhoneNumbers));
        assert_eq!((phones.fp, phones.tn), (1, 2));
        assert_eq!(phones.scored(), 3);
    }
}
