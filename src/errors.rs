use thiserror::Error;

use crate::{
    instrument::Symbol,
    orders::{OrderId, OrderState, Price, Quantity, RestingOrder, Side, Timestamp},
    trace::CancelOutcome,
};

/// Problems with the input fixtures themselves, as opposed to the engine
/// under test. `line` is 1-based within the file the text came from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixtureError {
    #[error("line {line}: order id {id} already declared on line {first_line}")]
    DuplicateId {
        line: usize,
        id: OrderId,
        first_line: usize,
    },

    #[error("line {line}: expected {expected} fields, found {found}: `{text}`")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
        text: String,
    },

    #[error("line {line}: {field} is not a valid {what}: `{text}`")]
    BadField {
        line: usize,
        field: &'static str,
        what: &'static str,
        text: String,
    },
}

/// Every way a trace can fail verification. The first one found ends the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("malformed fixture: {0}")]
    MalformedFixture(#[from] FixtureError),

    #[error("order {id} does not appear in the command stream")]
    UnknownOrder { id: OrderId },

    #[error("order {id} acknowledged with quantity {found}, expected {expected}")]
    QuantityMismatch {
        id: OrderId,
        expected: Quantity,
        found: Quantity,
    },

    /// An order acknowledged after it already rested or left the book.
    #[error("order {id} acknowledged again while {state}")]
    DuplicateAcceptance { id: OrderId, state: OrderState },

    #[error("order {id} acknowledged with {field} {found}, command stream says {expected}")]
    AttributeMismatch {
        id: OrderId,
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("execution sequence number {found}, expected {expected}")]
    SequenceViolation { expected: u64, found: u64 },

    #[error("orders {resting_id} and {incoming_id} are both {side} orders")]
    SameSideMatch {
        resting_id: OrderId,
        incoming_id: OrderId,
        side: Side,
    },

    #[error("execution against {resting_id} but the {side} book for {instrument} is empty")]
    NoRestingOrder {
        resting_id: OrderId,
        instrument: Symbol,
        side: Side,
    },

    #[error(
        "execution against {resting_id} but best {} order is {} @ {} (accepted at {})",
        .best.side, .best.id, .best.price, .best.accepted_at
    )]
    PriorityViolation {
        resting_id: OrderId,
        best: RestingOrder,
        /// Head of the book at the time of the execution, best first.
        top: Vec<RestingOrder>,
    },

    #[error("execution against {resting_id} at price {found}, resting price is {expected}")]
    PriceMismatch {
        resting_id: OrderId,
        expected: Price,
        found: Price,
    },

    #[error("execution of {quantity} against {resting_id} which only has {remaining} resting")]
    Overfill {
        resting_id: OrderId,
        remaining: Quantity,
        quantity: Quantity,
    },

    #[error("incoming order {incoming_id} has {remaining} left but executed {quantity}")]
    NegativeRemaining {
        incoming_id: OrderId,
        remaining: Quantity,
        quantity: Quantity,
    },

    #[error("cancel of {id} reported {outcome:?} (order was resting: {removed})")]
    InconsistentCancel {
        id: OrderId,
        outcome: CancelOutcome,
        removed: bool,
    },

    #[error("cancel result for {id} without an outstanding cancel command")]
    UnrequestedCancel { id: OrderId },

    #[error("event output time {output_time} precedes its input time {input_time}")]
    TimestampViolation {
        input_time: Timestamp,
        output_time: Timestamp,
    },

    #[error("{resolved} of {expected} commands were resolved by the trace")]
    IncompleteResolution { resolved: u64, expected: u64 },
}

impl Violation {
    /// Stable name of the violation kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Violation::MalformedFixture(_) => "MalformedFixture",
            Violation::UnknownOrder { .. } => "UnknownOrder",
            Violation::QuantityMismatch { .. } => "QuantityMismatch",
            Violation::DuplicateAcceptance { .. } => "DuplicateAcceptance",
            Violation::AttributeMismatch { .. } => "AttributeMismatch",
            Violation::SequenceViolation { .. } => "SequenceViolation",
            Violation::SameSideMatch { .. } => "SameSideMatch",
            Violation::NoRestingOrder { .. } => "NoRestingOrder",
            Violation::PriorityViolation { .. } => "PriorityViolation",
            Violation::PriceMismatch { .. } => "PriceMismatch",
            Violation::Overfill { .. } => "Overfill",
            Violation::NegativeRemaining { .. } => "NegativeRemaining",
            Violation::InconsistentCancel { .. } => "InconsistentCancel",
            Violation::UnrequestedCancel { .. } => "UnrequestedCancel",
            Violation::TimestampViolation { .. } => "TimestampViolation",
            Violation::IncompleteResolution { .. } => "IncompleteResolution",
        }
    }

    /// Book state captured with the violation, if any.
    pub fn book_snapshot(&self) -> Option<&[RestingOrder]> {
        match self {
            Violation::PriorityViolation { top, .. } => Some(top),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_errors_convert_into_violations() {
        let v: Violation = FixtureError::DuplicateId {
            line: 3,
            id: 9,
            first_line: 1,
        }
        .into();
        assert_eq!(v.kind(), "MalformedFixture");
        assert!(v.to_string().contains("already declared on line 1"));
    }

    #[test]
    fn inconsistent_cancel_message_names_book_state() {
        let v = Violation::InconsistentCancel {
            id: 4,
            outcome: CancelOutcome::Accepted,
            removed: false,
        };
        assert_eq!(v.kind(), "InconsistentCancel");
        assert!(v.to_string().contains("order was resting: false"));
    }

    #[test]
    fn duplicate_acceptance_names_order_state() {
        let v = Violation::DuplicateAcceptance {
            id: 1,
            state: OrderState::Done,
        };
        assert_eq!(v.to_string(), "order 1 acknowledged again while done");
    }
}
