//! Per-target accounting of a fill or audit pass.

use serde::{Deserialize, Serialize};

/// Why a target was not filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FillFailureReason {
    /// No element matched the target id.
    TargetNotFound,
    /// The value (or, when auditing, the target) is empty after trimming.
    EmptyValue,
    /// The value could not be formatted for a numeric target.
    FormatError,
}

impl FillFailureReason {
    /// Name as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            FillFailureReason::TargetNotFound => "targetNotFound",
            FillFailureReason::EmptyValue => "emptyValue",
            FillFailureReason::FormatError => "formatError",
        }
    }
}

/// One failed target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillFailure {
    pub target_id: String,
    pub reason: FillFailureReason,
}

/// Result of [`FormSync::fill`](super::FormSync::fill) or
/// [`FormSync::validate_fill`](super::FormSync::validate_fill).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillReport {
    /// Target ids written (or found non-empty), in mapping order.
    pub succeeded: Vec<String>,
    /// Target ids that failed, in mapping order.
    pub failed: Vec<FillFailure>,
    /// Number of mapping entries.
    pub total: usize,
}

impl FillReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(crate) fn succeed(&mut self, target_id: &str) {
        self.succeeded.push(target_id.to_string());
    }

    pub(crate) fn fail(&mut self, target_id: &str, reason: FillFailureReason) {
        self.failed.push(FillFailure {
            target_id: target_id.to_string(),
            reason,
        });
    }

    /// Failed target ids, in mapping order.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.target_id.as_str()).collect()
    }

    /// True when no target failed.
    pub fn is_valid(&self) -> bool {
        self.failed.is_empty()
    }

    /// One-line summary, e.g. `filled 3/5, failed: inv_amt (targetNotFound)`.
    pub fn summary(&self) -> String {
        let mut line = format!("filled {}/{}", self.succeeded.len(), self.total);
        if !self.failed.is_empty() {
            let failed: Vec<String> = self
                .failed
                .iter()
                .map(|f| format!("{} ({})", f.target_id, f.reason.as_str()))
                .collect();
            line.push_str(&format!(", failed: {}", failed.join(", ")));
        }
        line
    }
}
