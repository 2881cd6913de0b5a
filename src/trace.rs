//! Events emitted by the engine under test, and the line grammar they are
//! read from.
//!
//! Every trace line is whitespace separated and ends with the logical output
//! timestamp:
//!
//! ```text
//! B|S [submitter] <id> <instrument> <price> <qty> <in> <out>     acceptance
//! E <resting> <incoming> <seq> <price> <qty> <in> <out>          execution
//! X [submitter] <id> <A|R> <in> <out>                            cancel result
//! ```
//!
//! The bracketed submitter field is present only when the trace was produced
//! by an engine that tags events with the submitting thread.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    errors::FixtureError,
    instrument::Symbol,
    orders::{OrderId, Price, Quantity, Side, SubmitterId, Timestamp},
};

/// Outcome reported for a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelOutcome {
    Accepted,
    Rejected,
}

impl CancelOutcome {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "A" => Some(CancelOutcome::Accepted),
            "R" => Some(CancelOutcome::Rejected),
            _ => None,
        }
    }

    pub fn tag(self) -> char {
        match self {
            CancelOutcome::Accepted => 'A',
            CancelOutcome::Rejected => 'R',
        }
    }
}

/// The engine acknowledged an order as resting in its book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acceptance {
    pub side: Side,
    pub submitter: Option<SubmitterId>,
    pub id: OrderId,
    pub instrument: Symbol,
    pub price: Price,
    pub quantity: Quantity,
    pub input_time: Timestamp,
    pub output_time: Timestamp,
}

/// A trade between a resting order and an incoming one.
///
/// `exec_seq` is the engine's global execution counter, starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Execution {
    pub resting_id: OrderId,
    pub incoming_id: OrderId,
    pub exec_seq: u64,
    pub price: Price,
    pub quantity: Quantity,
    pub input_time: Timestamp,
    pub output_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelResult {
    pub submitter: Option<SubmitterId>,
    pub id: OrderId,
    pub outcome: CancelOutcome,
    pub input_time: Timestamp,
    pub output_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TraceEvent {
    Acceptance(Acceptance),
    Execution(Execution),
    CancelResult(CancelResult),
}

impl TraceEvent {
    pub fn input_time(&self) -> Timestamp {
        match self {
            TraceEvent::Acceptance(a) => a.input_time,
            TraceEvent::Execution(e) => e.input_time,
            TraceEvent::CancelResult(c) => c.input_time,
        }
    }

    pub fn output_time(&self) -> Timestamp {
        match self {
            TraceEvent::Acceptance(a) => a.output_time,
            TraceEvent::Execution(e) => e.output_time,
            TraceEvent::CancelResult(c) => c.output_time,
        }
    }

    /// Parses one raw trace line.
    ///
    /// Returns `Ok(None)` for noise: blank lines, comments and any line whose
    /// leading tag is not `B`, `S`, `E` or `X`. A line with a recognized tag
    /// must match its grammar exactly.
    pub fn parse_line(
        line: usize,
        text: &str,
        submitter_ids: bool,
    ) -> Result<Option<Self>, FixtureError> {
        let fields = LineFields::new(line, text);
        let Some(tag) = fields.tag() else {
            return Ok(None);
        };
        let event = match tag {
            "B" | "S" => {
                let side = Side::from_tag(tag).ok_or_else(|| fields.bad("tag", "side"))?;
                let (submitter, at) = if submitter_ids {
                    fields.expect_len(8)?;
                    (Some(fields.num(1, "submitter id")?), 2)
                } else {
                    fields.expect_len(7)?;
                    (None, 1)
                };
                TraceEvent::Acceptance(Acceptance {
                    side,
                    submitter,
                    id: fields.num(at, "order id")?,
                    instrument: fields.symbol(at + 1)?,
                    price: fields.num(at + 2, "price")?,
                    quantity: fields.num(at + 3, "quantity")?,
                    input_time: fields.num(at + 4, "input time")?,
                    output_time: fields.num(at + 5, "output time")?,
                })
            }
            "E" => {
                fields.expect_len(8)?;
                TraceEvent::Execution(Execution {
                    resting_id: fields.num(1, "resting id")?,
                    incoming_id: fields.num(2, "incoming id")?,
                    exec_seq: fields.num(3, "execution id")?,
                    price: fields.num(4, "price")?,
                    quantity: fields.num(5, "quantity")?,
                    input_time: fields.num(6, "input time")?,
                    output_time: fields.num(7, "output time")?,
                })
            }
            "X" => {
                let (submitter, at) = if submitter_ids {
                    fields.expect_len(6)?;
                    (Some(fields.num(1, "submitter id")?), 2)
                } else {
                    fields.expect_len(5)?;
                    (None, 1)
                };
                TraceEvent::CancelResult(CancelResult {
                    submitter,
                    id: fields.num(at, "order id")?,
                    outcome: CancelOutcome::from_tag(fields.get(at + 1))
                        .ok_or_else(|| fields.bad("outcome", "cancel outcome (A|R)"))?,
                    input_time: fields.num(at + 2, "input time")?,
                    output_time: fields.num(at + 3, "output time")?,
                })
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Renders the canonical trace line for the event.
impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Acceptance(a) => {
                write!(f, "{}", a.side.tag())?;
                if let Some(s) = a.submitter {
                    write!(f, " {}", s)?;
                }
                write!(
                    f,
                    " {} {} {} {} {} {}",
                    a.id, a.instrument, a.price, a.quantity, a.input_time, a.output_time
                )
            }
            TraceEvent::Execution(e) => write!(
                f,
                "E {} {} {} {} {} {} {}",
                e.resting_id,
                e.incoming_id,
                e.exec_seq,
                e.price,
                e.quantity,
                e.input_time,
                e.output_time
            ),
            TraceEvent::CancelResult(c) => {
                f.write_str("X")?;
                if let Some(s) = c.submitter {
                    write!(f, " {}", s)?;
                }
                write!(
                    f,
                    " {} {} {} {}",
                    c.id,
                    c.outcome.tag(),
                    c.input_time,
                    c.output_time
                )
            }
        }
    }
}

/// Whitespace-split view of one input or trace line, with typed accessors
/// that report failures against the line they came from.
pub(crate) struct LineFields<'a> {
    line: usize,
    text: &'a str,
    tokens: Vec<&'a str>,
}

impl<'a> LineFields<'a> {
    pub(crate) fn new(line: usize, text: &'a str) -> Self {
        let text = text.trim();
        Self {
            line,
            text,
            tokens: text.split_whitespace().collect(),
        }
    }

    /// Leading token, or `None` for blank lines.
    pub(crate) fn tag(&self) -> Option<&'a str> {
        self.tokens.first().copied()
    }

    pub(crate) fn expect_len(&self, expected: usize) -> Result<(), FixtureError> {
        if self.tokens.len() != expected {
            return Err(FixtureError::FieldCount {
                line: self.line,
                expected,
                found: self.tokens.len(),
                text: self.text.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn get(&self, idx: usize) -> &'a str {
        self.tokens.get(idx).copied().unwrap_or_default()
    }

    pub(crate) fn num<T: FromStr>(&self, idx: usize, field: &'static str) -> Result<T, FixtureError> {
        self.get(idx)
            .parse()
            .map_err(|_| self.bad(field, "non-negative integer"))
    }

    pub(crate) fn symbol(&self, idx: usize) -> Result<Symbol, FixtureError> {
        self.get(idx)
            .parse()
            .map_err(|_| self.bad("instrument", "symbol"))
    }

    pub(crate) fn bad(&self, field: &'static str, what: &'static str) -> FixtureError {
        FixtureError::BadField {
            line: self.line,
            field,
            what,
            text: self.text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_event_kind() {
        let a = TraceEvent::parse_line(1, "B 1 APPL 100 10 0 1", false)
            .unwrap()
            .unwrap();
        assert!(matches!(a, TraceEvent::Acceptance(ref a) if a.side == Side::Buy && a.quantity == 10));

        let e = TraceEvent::parse_line(2, "E 1 2 1 100 10 0 3", false)
            .unwrap()
            .unwrap();
        assert!(matches!(e, TraceEvent::Execution(ref e) if e.resting_id == 1 && e.incoming_id == 2));
        assert_eq!(e.output_time(), 3);

        let x = TraceEvent::parse_line(3, "X 1 R 0 2", false).unwrap().unwrap();
        assert!(matches!(x, TraceEvent::CancelResult(ref c) if c.outcome == CancelOutcome::Rejected));
    }

    #[test]
    fn submitter_field_is_read_when_enabled() {
        let a = TraceEvent::parse_line(1, "S 4 17 TSLA 2701 5 10 12", true)
            .unwrap()
            .unwrap();
        match a {
            TraceEvent::Acceptance(a) => {
                assert_eq!(a.submitter, Some(4));
                assert_eq!(a.id, 17);
                assert_eq!(a.instrument.as_str(), "TSLA");
            }
            other => panic!("unexpected event {other:?}"),
        }

        let x = TraceEvent::parse_line(2, "X 4 17 A 13 14", true).unwrap().unwrap();
        assert!(matches!(x, TraceEvent::CancelResult(ref c) if c.submitter == Some(4) && c.id == 17));
    }

    #[test]
    fn noise_lines_are_skipped() {
        for line in ["", "   ", "# comment", "--- banner ---", "C 3", "hello world"] {
            assert_eq!(TraceEvent::parse_line(1, line, false).unwrap(), None, "{line:?}");
        }
    }

    #[test]
    fn malformed_recognized_lines_are_rejected() {
        let err = TraceEvent::parse_line(5, "E 1 2 1 100 10 3", false).unwrap_err();
        assert!(matches!(err, FixtureError::FieldCount { line: 5, expected: 8, found: 7, .. }));

        let err = TraceEvent::parse_line(6, "B 1 APPL ten 10 0 1", false).unwrap_err();
        assert!(matches!(err, FixtureError::BadField { field: "price", .. }));

        let err = TraceEvent::parse_line(7, "X 1 Q 0 2", false).unwrap_err();
        assert!(matches!(err, FixtureError::BadField { field: "outcome", .. }));

        // a submitter-tagged line read without submitter ids has one field too many
        let err = TraceEvent::parse_line(8, "B 3 1 APPL 100 10 0 1", false).unwrap_err();
        assert!(matches!(err, FixtureError::FieldCount { .. }));
    }

    #[test]
    fn display_renders_canonical_line() {
        for (line, sids) in [
            ("B 1 APPL 100 10 0 1", false),
            ("S 2 9 AMZN 2703 44 5 8", true),
            ("E 1 2 1 100 10 0 3", false),
            ("X 7 A 4 9", false),
            ("X 2 7 R 4 9", true),
        ] {
            let ev = TraceEvent::parse_line(1, line, sids).unwrap().unwrap();
            assert_eq!(ev.to_string(), line);
        }
    }
}
