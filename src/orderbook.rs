use crate::{
    instrument::Symbol,
    orders::{OrderId, Price, RestingOrder, Side, SubmitterId},
};
use std::collections::{BTreeMap, HashMap, VecDeque, btree_map};

/// Identity of a resting order. The submitter is part of it because two
/// concurrent submitters may reuse the same order id.
pub type OrderKey = (OrderId, Option<SubmitterId>);

/// A [`PriorityBook`] stores the **resting** orders of one side of one
/// instrument.
///
/// Orders are grouped by price in a [`BTreeMap`]; each price level keeps its
/// orders in a [`VecDeque`] ordered by acceptance time, so the front of the
/// best level is always the order entitled to the next execution:
/// - `Buy` books rank the **highest** price first
/// - `Sell` books rank the **lowest** price first
///
/// `index` maps every resting order to its price level so removal by
/// identity only scans a single level.
#[derive(Debug, Clone)]
pub struct PriorityBook {
    side: Side,
    levels: BTreeMap<Price, VecDeque<RestingOrder>>,
    index: HashMap<OrderKey, Price>,
}

/// Internal enum to unify ascending and descending walks over the price levels.
///
/// - [`EitherIter::Fwd`] walks ascending prices (sell books).
/// - [`EitherIter::Rev`] walks descending prices (buy books).
enum EitherIter<'a> {
    Fwd(btree_map::Iter<'a, Price, VecDeque<RestingOrder>>),
    Rev(std::iter::Rev<btree_map::Iter<'a, Price, VecDeque<RestingOrder>>>),
}

impl<'a> Iterator for EitherIter<'a> {
    type Item = (&'a Price, &'a VecDeque<RestingOrder>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            EitherIter::Fwd(iter) => iter.next(),
            EitherIter::Rev(iter) => iter.next(),
        }
    }
}

impl PriorityBook {
    /// Creates a new, empty book for `side`.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn best_price(&self) -> Option<Price> {
        match self.side {
            Side::Buy => self.levels.keys().next_back().copied(),
            Side::Sell => self.levels.keys().next().copied(),
        }
    }

    /// The order with the most favorable price, earliest accepted among ties.
    pub fn best(&self) -> Option<&RestingOrder> {
        let price = self.best_price()?;
        self.levels.get(&price).and_then(|q| q.front())
    }

    pub fn best_mut(&mut self) -> Option<&mut RestingOrder> {
        let price = self.best_price()?;
        self.levels.get_mut(&price).and_then(|q| q.front_mut())
    }

    /// Removes and returns the best order, pruning its level if it empties.
    pub fn pop_best(&mut self) -> Option<RestingOrder> {
        let price = self.best_price()?;
        let queue = self.levels.get_mut(&price)?;
        let order = queue.pop_front()?;
        if queue.is_empty() {
            self.levels.remove(&price);
        }
        self.index.remove(&(order.id, order.submitter));
        Some(order)
    }

    /// Adds a resting order at its time position within its price level.
    ///
    /// Returns `false`, leaving the book untouched, if an order with the same
    /// identity is already resting.
    pub fn insert(&mut self, order: RestingOrder) -> bool {
        let key = (order.id, order.submitter);
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, order.price);
        let queue = self.levels.entry(order.price).or_default();
        let pos = queue.partition_point(|o| o.time_key() <= order.time_key());
        queue.insert(pos, order);
        true
    }

    pub fn contains(&self, id: OrderId, submitter: Option<SubmitterId>) -> bool {
        self.index.contains_key(&(id, submitter))
    }

    /// Removes the order with this identity, if it is resting here.
    pub fn remove(&mut self, id: OrderId, submitter: Option<SubmitterId>) -> Option<RestingOrder> {
        let price = self.index.remove(&(id, submitter))?;
        let queue = self.levels.get_mut(&price)?;
        let pos = queue
            .iter()
            .position(|o| o.id == id && o.submitter == submitter)?;
        let order = queue.remove(pos);
        if queue.is_empty() {
            self.levels.remove(&price);
        }
        order
    }

    /// Resting orders in priority order, best first.
    pub fn iter(&self) -> impl Iterator<Item = &RestingOrder> {
        let levels = match self.side {
            Side::Buy => EitherIter::Rev(self.levels.iter().rev()),
            Side::Sell => EitherIter::Fwd(self.levels.iter()),
        };
        levels.flat_map(|(_, queue)| queue.iter())
    }

    /// Copies of the first `n` orders in priority order.
    pub fn top(&self, n: usize) -> Vec<RestingOrder> {
        self.iter().take(n).cloned().collect()
    }
}

/// One [`PriorityBook`] per (instrument, side), created on first use.
#[derive(Debug, Default)]
pub struct BookSet {
    books: HashMap<(Symbol, Side), PriorityBook>,
}

impl BookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn book(&self, instrument: &Symbol, side: Side) -> Option<&PriorityBook> {
        self.books.get(&(instrument.clone(), side))
    }

    pub fn book_mut(&mut self, instrument: &Symbol, side: Side) -> &mut PriorityBook {
        self.books
            .entry((instrument.clone(), side))
            .or_insert_with(|| PriorityBook::new(side))
    }

    pub fn best(&self, instrument: &Symbol, side: Side) -> Option<&RestingOrder> {
        self.book(instrument, side).and_then(PriorityBook::best)
    }

    /// Routes the order to the book for its instrument and side.
    pub fn insert(&mut self, order: RestingOrder) -> bool {
        let instrument = order.instrument.clone();
        self.book_mut(&instrument, order.side).insert(order)
    }

    pub fn contains(&self, id: OrderId, submitter: Option<SubmitterId>) -> bool {
        self.books.values().any(|b| b.contains(id, submitter))
    }

    /// Removes the order from whichever book holds it, trying buy books
    /// before sell books.
    pub fn remove(&mut self, id: OrderId, submitter: Option<SubmitterId>) -> Option<RestingOrder> {
        for side in [Side::Buy, Side::Sell] {
            for ((_, book_side), book) in self.books.iter_mut() {
                if *book_side != side {
                    continue;
                }
                if let Some(order) = book.remove(id, submitter) {
                    return Some(order);
                }
            }
        }
        None
    }

    /// Total number of resting orders across all books.
    pub fn resting(&self) -> usize {
        self.books.values().map(PriorityBook::len).sum()
    }
}
