//! Which checks a verification run applies and how the trace is laid out.
//!
//! The same verifier serves engines that tag their output with the
//! submitting thread and engines that do not, so the trace layout and the
//! optional checks are chosen per run. A config can be decoded from JSON;
//! missing keys take their defaults:
//!
//! ```json
//! { "submitter_ids": true, "check_timestamps": true }
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Acceptance and cancel-result lines carry a submitter id after the tag,
    /// and cancellations only remove the order placed by that submitter.
    pub submitter_ids: bool,
    /// Execution sequence numbers must run 1, 2, 3, ... with no gaps.
    pub check_exec_sequence: bool,
    /// Every event's input time must not exceed its output time.
    pub check_timestamps: bool,
    /// Trades must print at the resting order's limit price.
    pub check_trade_price: bool,
    /// Log progress every this many replayed events; 0 disables.
    pub progress_interval: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            submitter_ids: false,
            check_exec_sequence: true,
            check_timestamps: false,
            check_trade_price: true,
            progress_interval: 10_000,
        }
    }
}

impl VerifierConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
