//! JSON Lines batch runs with optional expected-slot checking.

use std::collections::{BTreeMap, BTreeSet};

use clausemap_protocol::ParsedSentence;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinator::CoordinationStatus;
use crate::pipeline::{DecompositionRecord, Pipeline};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One input line: `{"id": .., "sentence": .., "expected": {"S": ..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub id: String,
    pub sentence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<BTreeMap<String, String>>,
}

/// Blank lines are skipped; line numbers in errors are 1-based.
pub fn read_batch(jsonl: &str) -> Result<Vec<BatchRecord>, BatchError> {
    jsonl
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| serde_json::from_str(line).map_err(|source| BatchError::Json { line: i + 1, source }))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotDiff {
    pub key: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum Verdict {
    Passed,
    Mismatch { diffs: Vec<SlotDiff> },
    /// No expectation was supplied.
    Unchecked,
    NoApplicableDetector,
    Crashed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub id: String,
    #[serde(flatten)]
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<DecompositionRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub passed: usize,
    pub mismatched: usize,
    pub unchecked: usize,
    pub no_detector: usize,
    pub crashed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        let mut summary = Self { total: outcomes.len(), ..Self::default() };
        for outcome in outcomes {
            match outcome.verdict {
                Verdict::Passed => summary.passed += 1,
                Verdict::Mismatch { .. } => summary.mismatched += 1,
                Verdict::Unchecked => summary.unchecked += 1,
                Verdict::NoApplicableDetector => summary.no_detector += 1,
                Verdict::Crashed { .. } => summary.crashed += 1,
            }
        }
        summary
    }
}

/// Compares slot keys in both directions: a slot the sentence produced but
/// the expectation omits is a mismatch too.
pub fn compare(expected: &BTreeMap<String, String>, actual: &BTreeMap<String, String>) -> Vec<SlotDiff> {
    let keys: BTreeSet<&String> = expected.keys().chain(actual.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let want = expected.get(key);
            let got = actual.get(key);
            (want != got).then(|| SlotDiff {
                key: key.clone(),
                expected: want.cloned(),
                actual: got.cloned(),
            })
        })
        .collect()
}

pub fn check(record: &BatchRecord, pipeline: &Pipeline) -> BatchOutcome {
    match pipeline.decompose_text(&record.sentence) {
        Ok(decomposed) => judge(&record.id, record.expected.as_ref(), decomposed),
        Err(err) => {
            tracing::warn!(id = %record.id, error = %err, "sentence could not be decomposed");
            BatchOutcome {
                id: record.id.clone(),
                verdict: Verdict::Crashed { error: err.to_string() },
                record: None,
            }
        }
    }
}

fn judge(id: &str, expected: Option<&BTreeMap<String, String>>, decomposed: DecompositionRecord) -> BatchOutcome {
    let verdict = if decomposed.result.status == CoordinationStatus::NoApplicableDetector {
        Verdict::NoApplicableDetector
    } else {
        match expected {
            None => Verdict::Unchecked,
            Some(expected) => {
                let diffs = compare(expected, &decomposed.slot_texts());
                if diffs.is_empty() {
                    Verdict::Passed
                } else {
                    Verdict::Mismatch { diffs }
                }
            }
        }
    };
    BatchOutcome { id: id.to_string(), verdict, record: Some(decomposed) }
}

fn finish(outcomes: Vec<BatchOutcome>) -> (Vec<BatchOutcome>, BatchSummary) {
    let summary = BatchSummary::from_outcomes(&outcomes);
    tracing::info!(
        total = summary.total,
        passed = summary.passed,
        mismatched = summary.mismatched,
        crashed = summary.crashed,
        "batch finished"
    );
    (outcomes, summary)
}

pub fn run_batch(pipeline: &Pipeline, records: &[BatchRecord]) -> (Vec<BatchOutcome>, BatchSummary) {
    finish(records.iter().map(|r| check(r, pipeline)).collect())
}

/// Already-parsed sentences (e.g. from a CoNLL document), numbered from 1.
pub fn run_parsed(pipeline: &Pipeline, sentences: &[ParsedSentence]) -> (Vec<BatchOutcome>, BatchSummary) {
    finish(
        sentences
            .iter()
            .enumerate()
            .map(|(i, sentence)| judge(&format!("s{}", i + 1), None, pipeline.decompose_parsed(sentence)))
            .collect(),
    )
}
