use std::fmt;

use serde_json::{Value, json};

use crate::verifier::{Failure, ReplaySummary, Verdict};

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events ({} acks, {} executions, {} cancels), {}/{} commands resolved, {} left resting",
            self.events,
            self.acceptances,
            self.executions,
            self.cancels,
            self.resolved,
            self.expected,
            self.resting
        )
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FAIL [{}] {}", self.violation.kind(), self.violation)?;
        if let (Some(line), Some(event)) = (self.line, &self.event) {
            writeln!(f, "  at trace line {}: {}", line, event)?;
        }
        if let Some(book) = self.violation.book_snapshot() {
            writeln!(f, "  book (best first):")?;
            for o in book {
                writeln!(
                    f,
                    "    id={} price={} remaining={} accepted_at={}",
                    o.id, o.price, o.remaining, o.accepted_at
                )?;
            }
        }
        write!(f, "  after {}", self.summary)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass(summary) => write!(f, "PASS: {}", summary),
            Verdict::Fail(failure) => write!(f, "{}", failure),
        }
    }
}

impl Verdict {
    /// Machine-readable form of the verdict.
    pub fn to_json(&self) -> Value {
        match self {
            Verdict::Pass(summary) => json!({
                "verdict": "pass",
                "summary": summary,
            }),
            Verdict::Fail(failure) => json!({
                "verdict": "fail",
                "kind": failure.violation.kind(),
                "message": failure.violation.to_string(),
                "line": failure.line,
                "event": failure.event.as_ref().map(ToString::to_string),
                "book": failure.violation.book_snapshot(),
                "summary": failure.summary,
            }),
        }
    }
}
