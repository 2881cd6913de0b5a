//! Replays a normalized engine trace against the command stream that
//! produced it.
//!
//! The verifier never matches orders itself. It rebuilds every book the
//! engine must have had from the acknowledgements in the trace, then checks
//! each execution and cancellation against that state:
//!
//! - an execution must hit the best resting order of the opposite side, for
//!   no more than it has left, with a contiguous execution sequence number
//! - a cancellation is accepted exactly when the order was still resting,
//!   and answers one outstanding cancel command
//! - an order that has left its book is never acknowledged again
//! - by the end, every submitted command has been resolved exactly once
//!
//! The first violation ends the run.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    commands::CommandDirectory,
    config::VerifierConfig,
    errors::Violation,
    normalize::{TraceRecord, normalize},
    orderbook::BookSet,
    orders::{OrderId, OrderState, RestingOrder},
    trace::{Acceptance, CancelOutcome, CancelResult, Execution, TraceEvent},
};

/// How many resting orders a priority diagnosis reports.
const SNAPSHOT_DEPTH: usize = 5;

/// Counters describing a completed replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub events: usize,
    pub acceptances: usize,
    pub executions: usize,
    pub cancels: usize,
    pub resolved: u64,
    pub expected: u64,
    /// Orders still resting when the trace ended.
    pub resting: usize,
}

/// The violation that ended a run, and where it happened.
///
/// `line` and `event` are absent when the failure is not tied to a trace
/// event, e.g. a bad command fixture or an incomplete trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub violation: Violation,
    pub line: Option<usize>,
    pub event: Option<TraceEvent>,
    pub summary: ReplaySummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass(ReplaySummary),
    Fail(Box<Failure>),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass(_))
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Verdict::Pass(_) => None,
            Verdict::Fail(f) => Some(&f.violation),
        }
    }

    pub fn summary(&self) -> &ReplaySummary {
        match self {
            Verdict::Pass(s) => s,
            Verdict::Fail(f) => &f.summary,
        }
    }

    fn fail(violation: Violation) -> Self {
        Verdict::Fail(Box::new(Failure {
            violation,
            line: None,
            event: None,
            summary: ReplaySummary::default(),
        }))
    }
}

/// State of one verification run. Build a fresh one per trace.
pub struct Verifier {
    config: VerifierConfig,
    directory: CommandDirectory,
    books: BookSet,
    resolved: u64,
    next_exec_seq: u64,
    arrivals: u64,
    summary: ReplaySummary,
}

impl Verifier {
    pub fn new(directory: CommandDirectory, config: VerifierConfig) -> Self {
        let expected = directory.expected_resolutions();
        Self {
            config,
            directory,
            books: BookSet::new(),
            resolved: 0,
            next_exec_seq: 1,
            arrivals: 0,
            summary: ReplaySummary {
                expected,
                ..Default::default()
            },
        }
    }

    pub fn books(&self) -> &BookSet {
        &self.books
    }

    pub fn directory(&self) -> &CommandDirectory {
        &self.directory
    }

    pub fn resolved(&self) -> u64 {
        self.resolved
    }

    fn snapshot(&self) -> ReplaySummary {
        ReplaySummary {
            resolved: self.resolved,
            resting: self.books.resting(),
            ..self.summary.clone()
        }
    }

    /// Applies one trace event, mutating books and remaining quantities.
    pub fn apply(&mut self, event: &TraceEvent) -> Result<(), Violation> {
        if self.config.check_timestamps && event.input_time() > event.output_time() {
            return Err(Violation::TimestampViolation {
                input_time: event.input_time(),
                output_time: event.output_time(),
            });
        }
        self.summary.events += 1;
        match event {
            TraceEvent::Acceptance(a) => {
                self.summary.acceptances += 1;
                self.on_acceptance(a)
            }
            TraceEvent::Execution(e) => {
                self.summary.executions += 1;
                self.on_execution(e)
            }
            TraceEvent::CancelResult(c) => {
                self.summary.cancels += 1;
                self.on_cancel(c)
            }
        }
    }

    fn on_acceptance(&mut self, a: &Acceptance) -> Result<(), Violation> {
        let order = self
            .directory
            .get(a.id)
            .ok_or(Violation::UnknownOrder { id: a.id })?;
        if order.state != OrderState::Pending {
            return Err(Violation::DuplicateAcceptance {
                id: a.id,
                state: order.state,
            });
        }
        if a.quantity != order.remaining {
            return Err(Violation::QuantityMismatch {
                id: a.id,
                expected: order.remaining,
                found: a.quantity,
            });
        }
        if a.side != order.side {
            return Err(mismatch(a.id, "side", order.side, a.side));
        }
        if a.instrument != order.instrument {
            return Err(mismatch(a.id, "instrument", &order.instrument, &a.instrument));
        }
        if a.price != order.price {
            return Err(mismatch(a.id, "price", order.price, a.price));
        }

        let resting = RestingOrder {
            id: a.id,
            submitter: a.submitter,
            side: a.side,
            instrument: a.instrument.clone(),
            price: a.price,
            remaining: a.quantity,
            accepted_at: a.output_time,
            arrival: self.arrivals,
        };
        self.arrivals += 1;
        self.books.insert(resting);
        self.advance(a.id, OrderState::Resting);
        Ok(())
    }

    fn on_execution(&mut self, e: &Execution) -> Result<(), Violation> {
        if self.config.check_exec_sequence {
            let expected = self.next_exec_seq;
            self.next_exec_seq += 1;
            if e.exec_seq != expected {
                return Err(Violation::SequenceViolation {
                    expected,
                    found: e.exec_seq,
                });
            }
        }

        let resting = self
            .directory
            .get(e.resting_id)
            .ok_or(Violation::UnknownOrder { id: e.resting_id })?;
        let incoming = self
            .directory
            .get(e.incoming_id)
            .ok_or(Violation::UnknownOrder { id: e.incoming_id })?;
        if resting.side == incoming.side {
            return Err(Violation::SameSideMatch {
                resting_id: e.resting_id,
                incoming_id: e.incoming_id,
                side: resting.side,
            });
        }
        let (side, instrument) = (resting.side, resting.instrument.clone());

        let book = self.books.book_mut(&instrument, side);
        let best = book.best().ok_or_else(|| Violation::NoRestingOrder {
            resting_id: e.resting_id,
            instrument: instrument.clone(),
            side,
        })?;
        if best.id != e.resting_id {
            return Err(Violation::PriorityViolation {
                resting_id: e.resting_id,
                best: best.clone(),
                top: book.top(SNAPSHOT_DEPTH),
            });
        }
        if self.config.check_trade_price && e.price != best.price {
            return Err(Violation::PriceMismatch {
                resting_id: e.resting_id,
                expected: best.price,
                found: e.price,
            });
        }
        if best.remaining < e.quantity {
            return Err(Violation::Overfill {
                resting_id: e.resting_id,
                remaining: best.remaining,
                quantity: e.quantity,
            });
        }

        let filled = match book.best_mut() {
            Some(best) => {
                best.remaining -= e.quantity;
                best.remaining == 0
            }
            None => false,
        };
        if filled {
            book.pop_best();
            self.advance(e.resting_id, OrderState::Done);
        }

        // the aggressor may never rest, so its remaining lives in the directory
        let incoming = self
            .directory
            .get_mut(e.incoming_id)
            .ok_or(Violation::UnknownOrder { id: e.incoming_id })?;
        incoming.remaining = incoming.remaining.checked_sub(e.quantity).ok_or(
            Violation::NegativeRemaining {
                incoming_id: e.incoming_id,
                remaining: incoming.remaining,
                quantity: e.quantity,
            },
        )?;
        // an incoming order that already rests keeps its book entry
        if incoming.remaining == 0 && incoming.state == OrderState::Pending {
            self.advance(e.incoming_id, OrderState::Done);
        }
        Ok(())
    }

    fn on_cancel(&mut self, c: &CancelResult) -> Result<(), Violation> {
        if !self.directory.take_cancel(c.id) {
            return Err(Violation::UnrequestedCancel { id: c.id });
        }
        let removed = self.books.remove(c.id, c.submitter).is_some();
        let consistent = match c.outcome {
            CancelOutcome::Accepted => removed,
            CancelOutcome::Rejected => !removed,
        };
        if !consistent {
            return Err(Violation::InconsistentCancel {
                id: c.id,
                outcome: c.outcome,
                removed,
            });
        }
        if removed {
            self.advance(c.id, OrderState::Done);
        }
        self.resolved += 1;
        Ok(())
    }

    /// Moves an order forward in its life. Leaving `Pending` resolves it.
    fn advance(&mut self, id: OrderId, next: OrderState) {
        if let Some(order) = self.directory.get_mut(id) {
            if order.state == OrderState::Pending {
                self.resolved += 1;
            }
            order.state = next;
        }
    }

    /// Terminal check: every submitted command must have been resolved.
    pub fn finish(&self) -> Result<ReplaySummary, Violation> {
        let expected = self.directory.expected_resolutions();
        if self.resolved != expected {
            let pending = self.directory.unresolved();
            let cancels = self.directory.unanswered_cancels();
            warn!(
                resolved = self.resolved,
                expected,
                pending = ?&pending[..pending.len().min(SNAPSHOT_DEPTH)],
                cancels = ?&cancels[..cancels.len().min(SNAPSHOT_DEPTH)],
                "trace left commands unresolved"
            );
            return Err(Violation::IncompleteResolution {
                resolved: self.resolved,
                expected,
            });
        }
        Ok(self.snapshot())
    }

    /// Replays every record in order and produces the run's verdict.
    pub fn replay(mut self, records: &[TraceRecord]) -> Verdict {
        let interval = self.config.progress_interval;
        for (i, record) in records.iter().enumerate() {
            debug!(line = record.line, event = %record.event, "replaying");
            if let Err(violation) = self.apply(&record.event) {
                warn!(
                    line = record.line,
                    kind = violation.kind(),
                    "{}",
                    violation
                );
                return Verdict::Fail(Box::new(Failure {
                    violation,
                    line: Some(record.line),
                    event: Some(record.event.clone()),
                    summary: self.snapshot(),
                }));
            }
            if interval > 0 && (i as u64 + 1) % interval == 0 {
                info!(replayed = i + 1, resolved = self.resolved, "replay progress");
            }
        }
        match self.finish() {
            Ok(summary) => {
                info!(
                    events = summary.events,
                    resolved = summary.resolved,
                    "trace verified"
                );
                Verdict::Pass(summary)
            }
            Err(violation) => Verdict::Fail(Box::new(Failure {
                violation,
                line: None,
                event: None,
                summary: self.snapshot(),
            })),
        }
    }
}

fn mismatch(
    id: OrderId,
    field: &'static str,
    expected: impl ToString,
    found: impl ToString,
) -> Violation {
    Violation::AttributeMismatch {
        id,
        field,
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

/// Verifies a trace against the command stream it was produced from.
///
/// Both inputs are raw lines; nothing is read from disk. Fixture problems in
/// either input are reported as a failed verdict.
pub fn verify<C, T, S1, S2>(commands: C, trace: T, config: &VerifierConfig) -> Verdict
where
    C: IntoIterator<Item = S1>,
    S1: AsRef<str>,
    T: IntoIterator<Item = S2>,
    S2: AsRef<str>,
{
    let directory = match CommandDirectory::from_lines(commands) {
        Ok(dir) => dir,
        Err(e) => return Verdict::fail(e.into()),
    };
    let records = match normalize(trace, config.submitter_ids) {
        Ok(records) => records,
        Err(e) => return Verdict::fail(e.into()),
    };
    Verifier::new(directory, config.clone()).replay(&records)
}
