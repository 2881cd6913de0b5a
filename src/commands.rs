use std::collections::{HashMap, hash_map::Entry};

use tracing::debug;

use crate::{
    errors::FixtureError,
    orders::{Order, OrderId, Side},
    trace::LineFields,
};

/// Ground truth for one verification run, built from the submitted command
/// stream.
///
/// Input lines are whitespace separated:
/// - `B|S <id> <instrument> <price> <quantity>` submits a new order
/// - `C <id>` cancels one
///
/// Every new order and every cancel counts once towards
/// [`CommandDirectory::expected_resolutions`]. Cancels are kept per id so
/// that each `C` line can be answered by exactly one cancel result.
#[derive(Debug, Default)]
pub struct CommandDirectory {
    orders: HashMap<OrderId, Order>,
    declared_on: HashMap<OrderId, usize>,
    cancels: u64,
    /// Cancel commands per id not yet answered by the trace.
    open_cancels: HashMap<OrderId, u64>,
}

impl CommandDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the directory from raw command lines.
    ///
    /// Blank lines and lines with an unknown tag are skipped. A line tagged
    /// `B`, `S` or `C` must be well formed, and an order id may only be
    /// declared once.
    pub fn from_lines<I, S>(lines: I) -> Result<Self, FixtureError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dir = Self::new();
        for (idx, raw) in lines.into_iter().enumerate() {
            dir.add_line(idx + 1, raw.as_ref())?;
        }
        debug!(
            orders = dir.orders.len(),
            cancels = dir.cancels,
            "command directory built"
        );
        Ok(dir)
    }

    fn add_line(&mut self, line: usize, text: &str) -> Result<(), FixtureError> {
        let fields = LineFields::new(line, text);
        match fields.tag() {
            Some(tag @ ("B" | "S")) => {
                fields.expect_len(5)?;
                let side = Side::from_tag(tag).ok_or_else(|| fields.bad("tag", "side"))?;
                let id = fields.num(1, "order id")?;
                let order = Order::new(
                    id,
                    side,
                    fields.symbol(2)?,
                    fields.num(3, "price")?,
                    fields.num(4, "quantity")?,
                );
                self.insert(line, order)
            }
            Some("C") => {
                fields.expect_len(2)?;
                let id = fields.num(1, "order id")?;
                self.add_cancel(id);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Registers a declared order. Fails if its id is already taken.
    pub fn insert(&mut self, line: usize, order: Order) -> Result<(), FixtureError> {
        match self.orders.entry(order.id) {
            Entry::Occupied(_) => Err(FixtureError::DuplicateId {
                line,
                id: order.id,
                first_line: self.declared_on.get(&order.id).copied().unwrap_or_default(),
            }),
            Entry::Vacant(slot) => {
                self.declared_on.insert(order.id, line);
                slot.insert(order);
                Ok(())
            }
        }
    }

    /// Registers a cancel command for `id`. The id need not be declared.
    fn add_cancel(&mut self, id: OrderId) {
        self.cancels += 1;
        *self.open_cancels.entry(id).or_default() += 1;
    }

    /// Uses up one outstanding cancel command for `id`. Returns `false` when
    /// every cancel for that id has already been answered.
    pub fn take_cancel(&mut self, id: OrderId) -> bool {
        match self.open_cancels.get_mut(&id) {
            Some(open) if *open > 0 => {
                *open -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn get_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&id)
    }

    /// Number of declared new orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn cancel_count(&self) -> u64 {
        self.cancels
    }

    /// How many commands a complete trace must resolve.
    pub fn expected_resolutions(&self) -> u64 {
        self.orders.len() as u64 + self.cancels
    }

    /// Orders that were never accounted for by the trace, sorted by id.
    pub fn unresolved(&self) -> Vec<OrderId> {
        let mut ids: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| !o.is_resolved())
            .map(|o| o.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids with cancel commands the trace never answered, sorted.
    pub fn unanswered_cancels(&self) -> Vec<OrderId> {
        let mut ids: Vec<OrderId> = self
            .open_cancels
            .iter()
            .filter(|&(_, &open)| open > 0)
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::OrderState;

    #[test]
    fn builds_orders_and_counts_cancels() {
        let dir = CommandDirectory::from_lines([
            "B 1 APPL 100 10",
            "S 2 APPL 101 5",
            "",
            "C 1",
            "C 99",
        ])
        .unwrap();
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.cancel_count(), 2);
        assert_eq!(dir.expected_resolutions(), 4);

        let o = dir.get(2).unwrap();
        assert_eq!(o.side, Side::Sell);
        assert_eq!(o.instrument.as_str(), "APPL");
        assert_eq!(o.price, 101);
        assert_eq!(o.remaining, 5);
        assert!(dir.get(99).is_none());
    }

    #[test]
    fn unknown_tags_are_ignored() {
        let dir = CommandDirectory::from_lines(["# seed 42", "Q 1 2 3", "B 1 TSLA 7 1"]).unwrap();
        assert_eq!(dir.expected_resolutions(), 1);
    }

    #[test]
    fn duplicate_id_is_a_fixture_error() {
        let err = CommandDirectory::from_lines(["B 1 APPL 100 10", "C 1", "S 1 APPL 100 3"])
            .unwrap_err();
        assert_eq!(
            err,
            FixtureError::DuplicateId {
                line: 3,
                id: 1,
                first_line: 1
            }
        );
    }

    #[test]
    fn malformed_submission_is_a_fixture_error() {
        let err = CommandDirectory::from_lines(["B 1 APPL 100"]).unwrap_err();
        assert!(matches!(err, FixtureError::FieldCount { expected: 5, found: 4, .. }));

        let err = CommandDirectory::from_lines(["C one"]).unwrap_err();
        assert!(matches!(err, FixtureError::BadField { field: "order id", .. }));
    }

    #[test]
    fn unresolved_lists_pending_orders() {
        let mut dir = CommandDirectory::from_lines(["B 3 APPL 1 1", "B 1 APPL 1 1"]).unwrap();
        dir.get_mut(3).unwrap().state = OrderState::Resting;
        assert_eq!(dir.unresolved(), vec![1]);
    }

    #[test]
    fn each_cancel_command_is_taken_once() {
        let mut dir = CommandDirectory::from_lines(["C 9", "C 4", "C 9"]).unwrap();
        assert!(dir.is_empty());
        assert_eq!(dir.cancel_count(), 3);
        assert!(dir.take_cancel(9));
        assert!(dir.take_cancel(9));
        assert!(!dir.take_cancel(9));
        assert!(!dir.take_cancel(1));
        assert_eq!(dir.unanswered_cancels(), vec![4]);
        assert!(dir.take_cancel(4));
        assert!(dir.unanswered_cancels().is_empty());
        // the expected total does not shrink as cancels are answered
        assert_eq!(dir.expected_resolutions(), 3);
    }
}
