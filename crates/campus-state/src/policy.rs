//! Workflow policy switches that change the transition table.

use serde::{Deserialize, Serialize};

/// Configurable workflow policy.
///
/// Whether a rejected resource may be resubmitted is not settled by the
/// product, so it is an explicit switch rather than an assumption baked
/// into the table. The default keeps `rejected` a dead end for submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowPolicy {
    /// Permit `rejected → pending` via submit-review by the owner.
    pub allow_resubmit_rejected: bool,
}

impl WorkflowPolicy {
    /// Policy with resubmission of rejected resources enabled.
    pub fn with_resubmission() -> Self {
        Self {
            allow_resubmit_rejected: true,
        }
    }
}
