use std::fs;
use std::path::{Path, PathBuf};

use safepost_types::DetectionResult;
use serde::Serialize;

use crate::{Dimension, EvalError, EvalRecord, Summary};

const CSV_HEADER: &[&str] = &[
    "Image Path",
    "Category",
    "Expected Safe",
    "Actual Safe",
    "Safe Correct",
    "Expected Emails",
    "Actual Emails",
    "Emails Correct",
    "Expected Address",
    "Actual Address",
    "Address Correct",
    "Expected Phone Numbers",
    "Actual Phone Numbers",
    "Phone Numbers Correct",
    "Expected License Plates",
    "Actual License Plates",
    "License Plates Correct",
    "Message",
    "Reasoning",
    "Redaction Suggestions",
    "Error",
];

const SUMMARY_HEADER: &[&str] = &[
    "Category",
    "Accuracy",
    "Precision",
    "Recall",
    "F1 Score",
    "Specificity",
    "TP",
    "TN",
    "FP",
    "FN",
    "Error Rate",
    "False Positive Rate",
    "False Negative Rate",
];

/// `YYYYmmdd_HHMMSS` in local time, used in output file names.
pub fn file_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub fn to_csv(records: &[EvalRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));
    for record in records {
        let actual = record.outcome.result();
        let mut row = vec![
            record.case.image.display().to_string(),
            record.case.folder.clone(),
        ];
        for dimension in Dimension::ALL {
            row.push(dimension.expected(&record.case.expected).to_string());
            row.push(opt(actual.map(|a| dimension.actual(a))));
            row.push(opt(record.correct(dimension)));
        }
        row.push(actual.map(|a| a.message.clone()).unwrap_or_default());
        row.push(actual.map(|a| a.reasoning.clone()).unwrap_or_default());
        row.push(
            actual
                .map(|a| a.redaction_suggestions.join("; "))
                .unwrap_or_default(),
        );
        row.push(record.outcome.error().unwrap_or_default().to_string());
        push_row(&mut out, row.into_iter());
    }
    out
}

/// One row per dimension: metrics as percentages, then raw counts, then
/// the error analysis rates.
pub fn summary_csv(summary: &Summary) -> String {
    let pct = |v: f64| format!("{:.2}%", v * 100.0);
    let mut out = String::new();
    push_row(&mut out, SUMMARY_HEADER.iter().map(|h| h.to_string()));
    for (dimension, c) in &summary.dimensions {
        let row = vec![
            dimension.label().to_string(),
            pct(c.accuracy(summary.total)),
            pct(c.precision()),
            pct(c.recall()),
            pct(c.f1()),
            pct(c.specificity()),
            c.tp.to_string(),
            c.tn.to_string(),
            c.fp.to_string(),
            c.fn_.to_string(),
            pct(c.error_rate()),
            pct(c.false_positive_rate()),
            pct(c.false_negative_rate()),
        ];
        push_row(&mut out, row.into_iter());
    }
    out
}

fn opt(value: Option<bool>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn push_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let line = fields.map(|f| escape(&f)).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push('\n');
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[derive(Serialize)]
struct DetailedResults<'a> {
    timestamp: String,
    total_tests: usize,
    results: Vec<DetailedEntry<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Flags<T> {
    safe: T,
    emails: T,
    address: T,
    phone_numbers: T,
    license_plates: T,
}

impl<T> Flags<T> {
    fn from_fn(mut f: impl FnMut(Dimension) -> T) -> Self {
        Self {
            safe: f(Dimension::ALL[0]),
            emails: f(Dimension::ALL[1]),
            address: f(Dimension::ALL[2]),
            phone_numbers: f(Dimension::ALL[3]),
            license_plates: f(Dimension::ALL[4]),
        }
    }
}

#[derive(Serialize)]
struct DetailedEntry<'a> {
    image: String,
    category: &'a str,
    expected: Flags<bool>,
    actual: Option<&'a DetectionResult>,
    correct: Flags<Option<bool>>,
    error: Option<&'a str>,
}

pub fn to_json(records: &[EvalRecord]) -> Result<String, EvalError> {
    let doc = DetailedResults {
        timestamp: chrono::Local::now().to_rfc3339(),
        total_tests: records.len(),
        results: records
            .iter()
            .map(|r| DetailedEntry {
                image: r.case.image.display().to_string(),
                category: &r.case.folder,
                expected: Flags::from_fn(|d| d.expected(&r.case.expected)),
                actual: r.outcome.result(),
                correct: Flags::from_fn(|d| r.correct(d)),
                error: r.outcome.error(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn write_csv(records: &[EvalRecord], dir: &Path, stamp: &str) -> Result<PathBuf, EvalError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("test_results_{stamp}.csv"));
    fs::write(&path, to_csv(records))?;
    Ok(path)
}

pub fn write_json(records: &[EvalRecord], dir: &Path, stamp: &str) -> Result<PathBuf, EvalError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("test_results_{stamp}.json"));
    fs::write(&path, to_json(records)?)?;
    Ok(path)
}

/// Writes `summary_metrics.csv`, replacing any earlier run's file.
pub fn write_summary_csv(summary: &Summary, dir: &Path) -> Result<PathBuf, EvalError> {
    fs::create_dir_all(dir)?;
    let path = dir.join("summary_metrics.csv");
    fs::write(&path, summary_csv(summary))?;
    Ok(path)
}

/// Copies each case's image to `dir/images/<folder>/`. Copy failures are
/// logged and skipped; returns the number copied.
pub fn copy_images(records: &[EvalRecord], dir: &Path) -> Result<usize, EvalError> {
    let images = dir.join("images");
    let mut copied = 0;
    for record in records {
        let folder = images.join(record.case.folder.trim());
        fs::create_dir_all(&folder)?;
        let Some(name) = record.case.image.file_name() else {
            continue;
        };
        match fs::copy(&record.case.image, folder.join(name)) {
            Ok(_) => copied += 1,
            Err(e) => tracing::warn!(image = %record.case.image.display(), error = %e, "could not copy image"),
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EvalCase, Expected, Outcome};
    use safepost_types::PiiCategory;

    fn records() -> Vec<EvalRecord> {
        vec![
            EvalRecord {
                case: EvalCase {
                    image: "corpus/Email/a.png".into(),
                    folder: "Email".into(),
                    expected: Expected {
                        category: PiiCategory::Emails,
                    },
                },
                outcome: Outcome::Detected(DetectionResult {
                    safe: false,
                    message: "Email, visible".into(),
                    reasoning: "An \"email\" is shown.".into(),
                    emails: true,
                    redaction_suggestions: vec!["Blur it".into(), "Crop".into()],
                    ..Default::default()
                }),
            },
            EvalRecord {
                case: EvalCase {
                    image: "corpus/Address/b.png".into(),
                    folder: "Address".into(),
                    expected: Expected {
                        category: PiiCategory::Address,
                    },
                },
                outcome: Outcome::Failed("HTTP status 500".into()),
            },
        ]
    }

    #[test]
    fn csv_rows_and_escaping() {
        let csv = to_csv(&records());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Image Path,Category,Expected Safe"));
        assert!(lines[1].starts_with("corpus/Email/a.png,Email,false,false,true,true,true,true"));
        assert!(lines[1].contains("\"Email, visible\""));
        assert!(lines[1].contains("\"An \"\"email\"\" is shown.\""));
        assert!(lines[1].contains("Blur it; Crop"));
        assert!(lines[2].starts_with("corpus/Address/b.png,Address,false,,,"));
        assert!(lines[2].ends_with(",HTTP status 500"));
    }

    #[test]
    fn json_document_shape() {
        let doc: serde_json::Value = serde_json::from_str(&to_json(&records()).unwrap()).unwrap();
        assert_eq!(doc["total_tests"], 2);
        let first = &doc["results"][0];
        assert_eq!(first["expected"]["emails"], true);
        assert_eq!(first["actual"]["emails"], true);
        assert_eq!(first["correct"]["safe"], true);
        let second = &doc["results"][1];
        assert!(second["actual"].is_null());
        assert!(second["correct"]["address"].is_null());
        assert_eq!(second["error"], "HTTP status 500");
    }

    #[test]
    fn writes_timestamped_files() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(&records(), dir.path(), "20250101_000000").unwrap();
        let json = write_json(&records(), dir.path(), "20250101_000000").unwrap();
        assert!(csv.ends_with("test_results_20250101_000000.csv"));
        assert!(json.exists());
    }

    #[test]
    fn summary_rows_per_dimension() {
        let summary = Summary::from_records(&records());
        let csv = summary_csv(&summary);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1 + Dimension::ALL.len());
        assert!(lines[0].starts_with("Category,Accuracy,Precision,Recall,F1 Score,Specificity,TP,TN,FP,FN"));
        assert!(lines[0].ends_with("Error Rate,False Positive Rate,False Negative Rate"));
        // One scored case, correctly flagged unsafe; the failed case only
        // lowers accuracy.
        assert_eq!(
            lines[1],
            format!(
                "{},50.00%,100.00%,100.00%,100.00%,0.00%,1,0,0,0,0.00%,0.00%,0.00%",
                Dimension::Safety.label()
            )
        );

        let dir = tempfile::tempdir().unwrap();
        let path = write_summary_csv(&summary, dir.path()).unwrap();
        assert!(path.ends_with("summary_metrics.csv"));
        assert_eq!(fs::read_to_string(path).unwrap(), csv);
    }

    #[test]
    fn copy_skips_missing_images() {
        let dir = tempfile::tempdir().unwrap();
        let copied = copy_images(&records(), dir.path()).unwrap();
        assert_eq!(copied, 0);
        assert!(dir.path().join("images/Email").is_dir());
    }
}
