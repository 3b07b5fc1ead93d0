//! Offline evaluation of the detector against a labelled image corpus.
//!
//! The corpus is a folder of category folders (`Address`, `Email`,
//! `License Plate`, `Phone Numbers`). Every image in it is expected to be
//! unsafe with exactly its folder's category flagged. Cases are sent one at a
//! time through an [`AnalyzeClient`], then scored per dimension.

use std::path::PathBuf;

use safepost_types::{DetectionResult, PiiCategory};
use serde::Serialize;
use thiserror::Error;

pub mod client;
pub mod corpus;
pub mod export;
pub mod metrics;
pub mod report;

pub use client::{AnalyzeClient, EngineAnalyzeClient, HttpAnalyzeClient};
pub use corpus::{discover, Corpus};
pub use metrics::{Confusion, Dimension, Summary};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("corpus folder '{0}' not found")]
    MissingRoot(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("login failed with status {0}")]
    Login(u16),
}

/// Ground truth for one image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Expected {
    pub category: PiiCategory,
}

impl Expected {
    /// Corpus images always contain PII.
    pub fn safe(&self) -> bool {
        false
    }

    pub fn flag(&self, category: PiiCategory) -> bool {
        self.category == category
    }
}

#[derive(Clone, Debug)]
pub struct EvalCase {
    pub image: PathBuf,
    /// Folder name as found on disk.
    pub folder: String,
    pub expected: Expected,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Detected(DetectionResult),
    Failed(String),
}

impl Outcome {
    pub fn result(&self) -> Option<&DetectionResult> {
        match self {
            Outcome::Detected(result) => Some(result),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Detected(_) => None,
            Outcome::Failed(e) => Some(e),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EvalRecord {
    pub case: EvalCase,
    pub outcome: Outcome,
}

impl EvalRecord {
    /// `None` when the analysis failed.
    pub fn correct(&self, dimension: Dimension) -> Option<bool> {
        let actual = self.outcome.result()?;
        Some(dimension.expected(&self.case.expected) == dimension.actual(actual))
    }
}

/// Runs every case sequentially. `progress` sees each record as it completes.
pub async fn run<F>(cases: Vec<EvalCase>, client: &dyn AnalyzeClient, mut progress: F) -> Vec<EvalRecord>
where
    F: FnMut(usize, usize, &EvalRecord),
{
    let total = cases.len();
    let mut records = Vec::with_capacity(total);
    for (i, case) in cases.into_iter().enumerate() {
        let outcome = match tokio::fs::read(&case.image).await {
            Ok(bytes) => {
                let file_name = case
                    .image
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                client
                    .analyze(&file_name, bytes, corpus::mime_type(&case.image))
                    .await
            }
            Err(e) => Outcome::Failed(format!("read {}: {e}", case.image.display())),
        };
        let record = EvalRecord { case, outcome };
        progress(i + 1, total, &record);
        records.push(record);
    }
    records
}
