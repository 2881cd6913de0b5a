use std::fmt;

use serde::{Deserialize, Serialize};

use crate::instrument::Symbol;

pub type OrderId = u64;
pub type SubmitterId = u64;
pub type Price = u64;
pub type Quantity = u64;
/// Logical ordering token taken from trace lines; not a wall-clock time.
pub type Timestamp = u64;

/// Represents which side of the market the order is on.
///
/// # Intuition
/// - `Buy` (Bid): resting buys are ranked from **highest to lowest price**,
///   a higher bid is more aggressive.
/// - `Sell` (Ask): resting sells are ranked from **lowest to highest price**,
///   a lower ask is more aggressive.
///
/// On the wire a side is the single-letter tag `B` or `S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,  // Bid
    Sell, // Ask
}

impl Side {
    /// Parses the leading tag of a command or trace line.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "B" => Some(Side::Buy),
            "S" => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn tag(self) -> char {
        match self {
            Side::Buy => 'B',
            Side::Sell => 'S',
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("Buy"),
            Side::Sell => f.write_str("Sell"),
        }
    }
}

/// Where an order is in its life, as far as the trace has shown so far.
///
/// Orders only move forward: `Pending -> Resting -> Done` or
/// `Pending -> Done`. A `Done` order is never seen in a book again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderState {
    /// Submitted, not yet acknowledged or fully executed.
    Pending,
    Resting,
    /// Fully executed or cancelled.
    Done,
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderState::Pending => f.write_str("pending"),
            OrderState::Resting => f.write_str("resting"),
            OrderState::Done => f.write_str("done"),
        }
    }
}

/// An order as declared in the command stream.
///
/// - `quantity` is the declared size and never changes
/// - `remaining` is what the order still has to trade as an *incoming* order;
///   it only ever decreases
/// - the order counts as resolved once it leaves [`OrderState::Pending`],
///   either by an acknowledgement as resting or by a full execution as
///   incoming
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub instrument: Symbol,
    pub price: Price,
    pub quantity: Quantity,
    pub remaining: Quantity,
    pub state: OrderState,
}

impl Order {
    pub fn new(id: OrderId, side: Side, instrument: Symbol, price: Price, quantity: Quantity) -> Self {
        Self {
            id,
            side,
            instrument,
            price,
            quantity,
            remaining: quantity,
            state: OrderState::Pending,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.state != OrderState::Pending
    }

    /// Quantity already traded while this order was the incoming side.
    pub fn executed_as_incoming(&self) -> Quantity {
        self.quantity - self.remaining
    }
}

/// An order currently held in a priority book.
///
/// - `accepted_at` is the output timestamp of the acknowledgement, used for
///   time priority within a price level
/// - `arrival` breaks ties between equal timestamps in replay order
/// - `submitter` is only set when the trace disambiguates concurrent submitters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestingOrder {
    pub id: OrderId,
    pub submitter: Option<SubmitterId>,
    pub side: Side,
    pub instrument: Symbol,
    pub price: Price,
    pub remaining: Quantity,
    pub accepted_at: Timestamp,
    pub arrival: u64,
}

impl RestingOrder {
    /// Time-priority key inside one price level.
    pub fn time_key(&self) -> (Timestamp, u64) {
        (self.accepted_at, self.arrival)
    }
}
