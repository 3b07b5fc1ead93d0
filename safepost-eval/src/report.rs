use crate::{Dimension, EvalRecord, Summary};

const RULE: &str = "================================================================================";
const THIN_RULE: &str = "--------------------------------------------------------------------------------";

fn pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

fn line(out: &mut String, text: impl AsRef<str>) {
    out.push_str(text.as_ref());
    out.push('\n');
}

fn heading(out: &mut String, title: &str) {
    line(out, format!("\n{RULE}\n{title}\n{RULE}"));
}

/// Human-readable evaluation report: overall safety detection, per-category
/// metrics, error analysis and a summary table.
pub fn render(summary: &Summary) -> String {
    let mut out = String::new();
    let total = summary.total;
    line(&mut out, format!("{RULE}\nEVALUATION REPORT\n{RULE}"));
    line(&mut out, format!("\nTotal Images Tested: {total}"));
    if summary.failed > 0 {
        line(&mut out, format!("Failed Analyses: {}", summary.failed));
    }

    let safety = summary.get(Dimension::Safety);
    line(&mut out, format!("\nOVERALL SAFE/UNSAFE DETECTION\n{THIN_RULE}"));
    line(&mut out, format!("Accuracy: {}", pct(safety.accuracy(total))));
    line(&mut out, format!("True Positives (correctly flagged unsafe): {}", safety.tp));
    line(&mut out, format!("True Negatives (correctly flagged safe): {}", safety.tn));
    line(&mut out, format!("False Positives (flagged unsafe when safe): {}", safety.fp));
    line(&mut out, format!("False Negatives (flagged safe when unsafe): {}", safety.fn_));
    line(&mut out, format!("Precision: {}", pct(safety.precision())));
    line(&mut out, format!("Recall: {}", pct(safety.recall())));
    line(&mut out, format!("F1 Score: {}", pct(safety.f1())));

    heading(&mut out, "CATEGORY-SPECIFIC METRICS");
    for (dimension, c) in summary.dimensions.iter().skip(1) {
        line(&mut out, format!("\n{}\n{THIN_RULE}", dimension.label().to_uppercase()));
        line(&mut out, format!("Accuracy: {}", pct(c.accuracy(total))));
        line(&mut out, format!("Precision: {}", pct(c.precision())));
        line(&mut out, format!("Recall: {}", pct(c.recall())));
        line(&mut out, format!("F1 Score: {}", pct(c.f1())));
        line(&mut out, format!("Specificity: {}", pct(c.specificity())));
        line(&mut out, "\nConfusion Matrix:");
        line(&mut out, format!("  True Positives:  {:4}  |  False Negatives: {:4}", c.tp, c.fn_));
        line(&mut out, format!("  False Positives: {:4}  |  True Negatives:  {:4}", c.fp, c.tn));
    }

    heading(&mut out, "ERROR ANALYSIS");
    line(
        &mut out,
        format!("{:<20} {:<12} {:<12} {:<12}", "Category", "Error", "FP Rate", "FN Rate"),
    );
    line(&mut out, THIN_RULE);
    for (dimension, c) in &summary.dimensions {
        line(
            &mut out,
            format!(
                "{:<20} {:<12} {:<12} {:<12}",
                dimension.label(),
                pct(c.error_rate()),
                pct(c.false_positive_rate()),
                pct(c.false_negative_rate())
            ),
        );
    }

    heading(&mut out, "CONFUSION MATRIX SUMMARY");
    line(
        &mut out,
        format!(
            "{:<20} {:<8} {:<8} {:<8} {:<8} {:<10}",
            "Category", "TP", "TN", "FP", "FN", "Accuracy"
        ),
    );
    line(&mut out, THIN_RULE);
    for (dimension, c) in &summary.dimensions {
        line(
            &mut out,
            format!(
                "{:<20} {:<8} {:<8} {:<8} {:<8} {:<10}",
                dimension.label(),
                c.tp,
                c.tn,
                c.fp,
                c.fn_,
                pct(c.accuracy(total))
            ),
        );
    }
    line(&mut out, format!("\n{RULE}"));
    out
}

/// Progress output for one finished case: the safety verdict against the
/// expected value, then the model's reasoning on its own line.
pub fn progress(done: usize, total: usize, record: &EvalRecord) -> String {
    let name = record
        .case
        .image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut out = format!("[{done}/{total}] {}/{name} ", record.case.folder.trim());
    match record.outcome.result() {
        Some(actual) => {
            let mark = if record.correct(Dimension::Safety) == Some(true) {
                "ok"
            } else {
                "MISS"
            };
            out.push_str(&format!(
                "{mark} Safe: {} (expected: {})",
                actual.safe,
                record.case.expected.safe()
            ));
            if !actual.reasoning.is_empty() {
                out.push_str(&format!("\n    {}", actual.reasoning));
            }
        }
        None => out.push_str(&format!(
            "error: {}",
            record.outcome.error().unwrap_or_default()
        )),
    }
    out
}

/// One block per successful case with its reasoning and flagged categories.
pub fn render_reasoning(records: &[EvalRecord]) -> String {
    let mut out = String::new();
    line(&mut out, format!("{RULE}\nREASONING SUMMARY\n{RULE}"));
    for (i, record) in records.iter().enumerate() {
        let Some(actual) = record.outcome.result() else {
            continue;
        };
        let mark = if record.correct(Dimension::Safety) == Some(true) {
            "ok"
        } else {
            "MISS"
        };
        let name = record
            .case
            .image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let detected: Vec<&str> = Dimension::ALL
            .iter()
            .skip(1)
            .filter(|d| d.actual(actual))
            .map(|d| d.key())
            .collect();
        let detected = if detected.is_empty() {
            "none".to_string()
        } else {
            detected.join(", ")
        };
        line(&mut out, format!("\n[{}] {}/{} {mark}", i + 1, record.case.folder, name));
        line(&mut out, format!("    Reasoning: {}", actual.reasoning));
        line(&mut out, format!("    Detected: {detected}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EvalCase, Expected, Outcome};
    use safepost_types::{DetectionResult, PiiCategory};

    fn records() -> Vec<EvalRecord> {
        vec![
            EvalRecord {
                case: EvalCase {
                    image: "corpus/Phone Numbers/p.png".into(),
                    folder: "Phone Numbers".into(),
                    expected: Expected {
                        category: PiiCategory::PhoneNumbers,
                    },
                },
                outcome: Outcome::Detected(DetectionResult {
                    safe: false,
                    reasoning: "A phone number is visible.".into(),
                    phone_numbers: true,
                    address: true,
                    ..Default::default()
                }),
            },
            EvalRecord {
                case: EvalCase {
                    image: "corpus/Address/a.png".into(),
                    folder: "Address".into(),
                    expected: Expected {
                        category: PiiCategory::Address,
                    },
                },
                outcome: Outcome::Failed("boom".into()),
            },
        ]
    }

    #[test]
    fn report_lists_every_dimension() {
        let text = render(&Summary::from_records(&records()));
        assert!(text.contains("Total Images Tested: 2"));
        assert!(text.contains("Failed Analyses: 1"));
        assert!(text.contains("Accuracy: 50.00%"));
        for dimension in Dimension::ALL {
            assert!(text.contains(dimension.label()), "missing {}", dimension.label());
        }
    }

    #[test]
    fn report_includes_error_analysis() {
        let text = render(&Summary::from_records(&records()));
        let section = text
            .split("ERROR ANALYSIS")
            .nth(1)
            .and_then(|rest| rest.split("CONFUSION MATRIX SUMMARY").next())
            .unwrap();
        // The phone-number image was also flagged for an address.
        let address = section
            .lines()
            .find(|l| l.starts_with("Addresses"))
            .unwrap();
        assert!(address.contains("100.00%"));
        assert!(section.contains("FP Rate"));
    }

    #[test]
    fn progress_shows_verdict_against_expected() {
        let records = records();
        assert_eq!(
            progress(1, 2, &records[0]),
            "[1/2] Phone Numbers/p.png ok Safe: false (expected: false)\n    A phone number is visible."
        );
        assert_eq!(progress(2, 2, &records[1]), "[2/2] Address/a.png error: boom");
    }

    #[test]
    fn reasoning_skips_failures() {
        let text = render_reasoning(&records());
        assert!(text.contains("[1] Phone Numbers/p.png ok"));
        assert!(text.contains("Detected: address, phoneNumbers"));
        assert!(!text.contains("[2]"));
    }
}
