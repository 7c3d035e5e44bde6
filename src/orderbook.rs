//! The limit order book: two AVL trees of price levels, cross-indexed by
//! order id and by price, with cached best bid and best ask.
//!
//! This is a pure data structure: it answers market-data queries and keeps
//! the resting book consistent under add/update/cancel traffic. Matching,
//! feed decoding and persistence live with external collaborators that
//! push [`Order`] records through [`OrderBook::process`].
//!
//! The book is single-writer: every operation runs to completion and no
//! internal state is shared. Readers wanting a consistent snapshot run
//! between `process` calls; the borrow checker enforces that read views
//! cannot outlive the next mutation.

use crate::avl_tree::{AvlNode, AvlTree};
use crate::limit::Limit;
use crate::order::{Order, OrderNode};
use crate::types::{OrderId, Price, Quantity, Side, Timestamp};
use crate::{OrderBookError, Result};
use std::collections::HashMap;
use tracing::{debug, trace};

/// In-memory limit order book for a single instrument.
///
/// Price levels and orders live in index arenas with free lists, so
/// cancel-heavy traffic recycles slots instead of churning the allocator.
/// All cross-references (FIFO links, tree linkage, parent level) are
/// arena indices: non-owning and trivially nullable.
#[derive(Debug)]
pub struct OrderBook {
    /// Arena of resting orders
    orders: Vec<Option<OrderNode>>,
    /// Recycled slots in the order arena
    free_orders: Vec<usize>,
    /// Map from order id to arena index
    order_index: HashMap<OrderId, usize>,

    /// Arena of price levels (including the two tree sentinels)
    limits: Vec<Option<Limit>>,
    /// Recycled slots in the limit arena
    free_limits: Vec<usize>,
    /// Map from price to arena index
    price_index: HashMap<Price, usize>,

    /// Root sentinel of the bid tree
    bid_sentinel: usize,
    /// Root sentinel of the ask tree
    ask_sentinel: usize,

    /// Cached maximum-price bid level
    best_bid: Option<usize>,
    /// Cached minimum-price ask level
    best_ask: Option<usize>,

    /// Clock used to stamp orders that arrive without a timestamp
    current_time: Timestamp,
}

impl OrderBook {
    /// Create a new empty book.
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Create a new book with pre-sized arenas and indices.
    pub fn with_capacity(order_capacity: usize, limit_capacity: usize) -> Self {
        let mut book = Self {
            orders: Vec::with_capacity(order_capacity),
            free_orders: Vec::new(),
            order_index: HashMap::with_capacity(order_capacity),
            limits: Vec::with_capacity(limit_capacity + 2),
            free_limits: Vec::new(),
            price_index: HashMap::with_capacity(limit_capacity),
            bid_sentinel: 0,
            ask_sentinel: 0,
            best_bid: None,
            best_ask: None,
            current_time: 0,
        };
        book.bid_sentinel = book.allocate_limit_index();
        book.limits[book.bid_sentinel] = Some(Limit::sentinel(Side::Bid));
        book.ask_sentinel = book.allocate_limit_index();
        book.limits[book.ask_sentinel] = Some(Limit::sentinel(Side::Ask));
        book
    }

    /// Set the book clock. Orders without their own timestamp are stamped
    /// with this value on entry; tests advance it monotonically.
    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    /// The book clock's current value.
    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    /// Process an order message.
    ///
    /// A zero size removes the order with that id; a known id is updated
    /// in place; anything else is added to the book. Returns `false` only
    /// for a cancel naming an unknown id, which is a benign no-op (feeds
    /// cancel speculatively).
    pub fn process(&mut self, order: Order) -> Result<bool> {
        if order.size == 0 {
            Ok(self.remove(order.uid).is_some())
        } else if self.order_index.contains_key(&order.uid) {
            self.update(order)?;
            Ok(true)
        } else {
            self.add(order)?;
            Ok(true)
        }
    }

    /// Add a new order to the book.
    ///
    /// The first order at a price creates the level (O(log M) tree
    /// insert); later orders append to the level's FIFO tail in O(1).
    pub fn add(&mut self, order: Order) -> Result<()> {
        if order.price == 0 {
            debug!(uid = order.uid, "rejected order with zero price");
            return Err(OrderBookError::InvalidPrice(order.price));
        }
        if order.size == 0 {
            debug!(uid = order.uid, "rejected add with zero size");
            return Err(OrderBookError::InvalidSize(order.size));
        }
        if self.order_index.contains_key(&order.uid) {
            debug!(uid = order.uid, "rejected duplicate order id");
            return Err(OrderBookError::DuplicateOrder(order.uid));
        }

        let entry_time = order.timestamp.unwrap_or(self.current_time);
        let order_index = self.allocate_order_index();
        self.orders[order_index] = Some(OrderNode::new(&order, entry_time));
        self.order_index.insert(order.uid, order_index);

        match self.price_index.get(&order.price).copied() {
            Some(limit_index) => {
                let limit = self.limits[limit_index].as_mut().unwrap();
                limit.push_order(&mut self.orders, limit_index, order_index);
            }
            None => {
                let limit_index = self.allocate_limit_index();
                self.limits[limit_index] =
                    Some(Limit::new(order.price, order.side, order.size));
                let limit = self.limits[limit_index].as_mut().unwrap();
                limit.push_order(&mut self.orders, limit_index, order_index);

                self.price_index.insert(order.price, limit_index);
                let sentinel = match order.side {
                    Side::Bid => self.bid_sentinel,
                    Side::Ask => self.ask_sentinel,
                };
                self.insert(sentinel, limit_index);
                self.promote_best(limit_index, order.side, order.price);
                trace!(price = order.price, side = %order.side, "created price level");
            }
        }

        trace!(uid = order.uid, size = order.size, price = order.price, "added order");
        Ok(())
    }

    /// Update a resting order's size in place.
    ///
    /// The order keeps its FIFO position and identity; the level's
    /// aggregate moves by the signed size change. Side and price are
    /// immutable here: changing either is a remove plus an add under a
    /// fresh id, and a mismatch is rejected.
    pub fn update(&mut self, order: Order) -> Result<()> {
        if order.size == 0 {
            return Err(OrderBookError::InvalidSize(order.size));
        }
        let order_index = *self
            .order_index
            .get(&order.uid)
            .ok_or(OrderBookError::OrderNotFound(order.uid))?;

        let (limit_index, old_size) = {
            let node = self.orders[order_index].as_ref().unwrap();
            if node.side != order.side || node.price != order.price {
                debug!(uid = order.uid, "rejected update changing side or price");
                return Err(OrderBookError::UpdateMismatch(order.uid));
            }
            (node.parent_limit.unwrap(), node.size)
        };

        self.orders[order_index].as_mut().unwrap().size = order.size;
        self.limits[limit_index]
            .as_mut()
            .unwrap()
            .adjust_size(old_size, order.size);

        trace!(uid = order.uid, from = old_size, to = order.size, "updated order size");
        Ok(())
    }

    /// Remove an order from the book.
    ///
    /// Returns the removed order's record, or `None` when the id is
    /// unknown. A level left empty is deleted from its tree; if it was
    /// the cached best, the cache moves to the level's in-order neighbor
    /// (the next-lower bid, or the next-higher ask), computed before the
    /// node leaves the tree.
    pub fn remove(&mut self, uid: OrderId) -> Option<Order> {
        let order_index = self.order_index.remove(&uid)?;
        let (limit_index, record) = {
            let order = self.orders[order_index].as_ref().unwrap();
            (order.parent_limit.unwrap(), order.record())
        };

        let limit = self.limits[limit_index].as_mut().unwrap();
        limit.unlink_order(&mut self.orders, order_index);
        self.free_order_index(order_index);
        trace!(uid, "removed order");

        if self.limits[limit_index].as_ref().unwrap().is_empty() {
            let (price, side) = {
                let limit = self.limits[limit_index].as_ref().unwrap();
                (limit.price, limit.side)
            };
            self.price_index.remove(&price);
            match side {
                Side::Bid => {
                    if self.best_bid == Some(limit_index) {
                        self.best_bid = self.predecessor(limit_index);
                    }
                }
                Side::Ask => {
                    if self.best_ask == Some(limit_index) {
                        self.best_ask = self.successor(limit_index);
                    }
                }
            }
            AvlTree::remove(self, limit_index);
            self.free_limit_index(limit_index);
            trace!(price, side = %side, "removed empty price level");
        }

        Some(record)
    }

    /// The best bid and best ask as read views.
    pub fn top_level(&self) -> (Option<LevelView<'_>>, Option<LevelView<'_>>) {
        (
            self.best_bid.map(|index| self.level_view(index)),
            self.best_ask.map(|index| self.level_view(index)),
        )
    }

    /// Price levels on both sides, ordered away from the spread: bids
    /// descending below the best ask, asks ascending above the best bid.
    /// When one side is empty the spread filter degenerates to the whole
    /// remaining side. `depth` truncates each side when given.
    pub fn levels(&self, depth: Option<usize>) -> (Vec<LevelView<'_>>, Vec<LevelView<'_>>) {
        let mut prices: Vec<Price> = self.price_index.keys().copied().collect();
        prices.sort_unstable();

        let best_bid_price = self.best_bid.map(|index| self.limit(index).price);
        let best_ask_price = self.best_ask.map(|index| self.limit(index).price);
        let take = depth.unwrap_or(usize::MAX);

        let bids: Vec<LevelView<'_>> = prices
            .iter()
            .rev()
            .filter(|&&price| best_ask_price.map_or(true, |ask| price < ask))
            .map(|price| self.level_view(self.price_index[price]))
            .take(take)
            .collect();
        let asks: Vec<LevelView<'_>> = prices
            .iter()
            .filter(|&&price| best_bid_price.map_or(true, |bid| price > bid))
            .map(|price| self.level_view(self.price_index[price]))
            .take(take)
            .collect();

        (bids, asks)
    }

    /// Best bid price and aggregate size.
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.best_bid.map(|index| {
            let limit = self.limit(index);
            (limit.price, limit.size)
        })
    }

    /// Best ask price and aggregate size.
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.best_ask.map(|index| {
            let limit = self.limit(index);
            (limit.price, limit.size)
        })
    }

    /// Difference between best ask and best bid, zero if crossed.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some((ask, _)), Some((bid, _))) => Some(ask.saturating_sub(bid)),
            _ => None,
        }
    }

    /// Midpoint of best bid and best ask.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some((ask, _)), Some((bid, _))) => Some((ask + bid) / 2),
            _ => None,
        }
    }

    /// Aggregate size resting at a price.
    pub fn volume_at_price(&self, price: Price) -> Option<Quantity> {
        self.price_index.get(&price).map(|&index| self.limit(index).size)
    }

    /// Number of orders resting at a price.
    pub fn orders_at_price(&self, price: Price) -> Option<usize> {
        self.price_index
            .get(&price)
            .map(|&index| self.limit(index).order_count())
    }

    /// Check if an order id is resting in the book.
    pub fn contains_order(&self, uid: OrderId) -> bool {
        self.order_index.contains_key(&uid)
    }

    /// Get a resting order by id.
    pub fn get_order(&self, uid: OrderId) -> Option<&OrderNode> {
        self.order_index
            .get(&uid)
            .and_then(|&index| self.orders[index].as_ref())
    }

    /// Total number of resting orders.
    pub fn total_orders(&self) -> usize {
        self.order_index.len()
    }

    /// Total number of populated price levels.
    pub fn total_levels(&self) -> usize {
        self.price_index.len()
    }

    // Internal helpers

    fn limit(&self, index: usize) -> &Limit {
        self.limits[index].as_ref().unwrap()
    }

    fn level_view(&self, index: usize) -> LevelView<'_> {
        LevelView { book: self, index }
    }

    /// Take over the best cache if the new level beats it.
    fn promote_best(&mut self, limit_index: usize, side: Side, price: Price) {
        match side {
            Side::Bid => {
                if self.best_bid.map_or(true, |best| price > self.limit(best).price) {
                    self.best_bid = Some(limit_index);
                }
            }
            Side::Ask => {
                if self.best_ask.map_or(true, |best| price < self.limit(best).price) {
                    self.best_ask = Some(limit_index);
                }
            }
        }
    }

    fn allocate_order_index(&mut self) -> usize {
        if let Some(index) = self.free_orders.pop() {
            index
        } else {
            self.orders.push(None);
            self.orders.len() - 1
        }
    }

    fn free_order_index(&mut self, index: usize) {
        self.orders[index] = None;
        self.free_orders.push(index);
    }

    fn allocate_limit_index(&mut self) -> usize {
        if let Some(index) = self.free_limits.pop() {
            index
        } else {
            self.limits.push(None);
            self.limits.len() - 1
        }
    }

    fn free_limit_index(&mut self, index: usize) {
        self.limits[index] = None;
        self.free_limits.push(index);
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl AvlTree for OrderBook {
    fn get_price(&self, index: usize) -> Price {
        self.limit(index).price
    }

    fn get_node(&self, index: usize) -> &AvlNode {
        &self.limit(index).avl
    }

    fn get_node_mut(&mut self, index: usize) -> &mut AvlNode {
        &mut self.limits[index].as_mut().unwrap().avl
    }
}

/// Read-only view of one price level.
///
/// Valid until the next mutating call on the book; the borrow makes that
/// a compile-time guarantee.
#[derive(Debug, Clone, Copy)]
pub struct LevelView<'a> {
    book: &'a OrderBook,
    index: usize,
}

impl<'a> LevelView<'a> {
    /// The level's price.
    pub fn price(&self) -> Price {
        self.book.limit(self.index).price
    }

    /// Aggregate size resting at this level.
    pub fn size(&self) -> Quantity {
        self.book.limit(self.index).size
    }

    /// Notional volume: `price * size`.
    pub fn volume(&self) -> u128 {
        self.book.limit(self.index).volume()
    }

    /// The level's side.
    pub fn side(&self) -> Side {
        self.book.limit(self.index).side
    }

    /// Number of orders queued at this level.
    pub fn len(&self) -> usize {
        self.book.limit(self.index).order_count()
    }

    /// Check if the level has no orders.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the level's orders in FIFO (arrival) order.
    pub fn orders(&self) -> LevelOrders<'a> {
        LevelOrders {
            orders: &self.book.orders,
            current: self.book.limit(self.index).queue.head,
        }
    }
}

/// Iterator over a level's orders, oldest first.
pub struct LevelOrders<'a> {
    orders: &'a [Option<OrderNode>],
    current: Option<usize>,
}

impl<'a> Iterator for LevelOrders<'a> {
    type Item = &'a OrderNode;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.current?;
        let order = self.orders[index].as_ref()?;
        self.current = order.next;
        Some(order)
    }
}

#[cfg(test)]
impl OrderBook {
    /// Walk the whole structure and assert every cross-index invariant:
    /// tree/map agreement, strict BST order, AVL balance and exact
    /// heights, FIFO link consistency, aggregate sizes, and the cached
    /// extrema.
    pub(crate) fn check_invariants(&self) {
        let mut tree_levels = 0;
        let mut queued_orders = 0;

        for (sentinel, side, best) in [
            (self.bid_sentinel, Side::Bid, self.best_bid),
            (self.ask_sentinel, Side::Ask, self.best_ask),
        ] {
            let sentinel_node = self.get_node(sentinel);
            assert!(sentinel_node.sentinel, "sentinel flag lost");
            assert_eq!(sentinel_node.left_child, None, "sentinel grew a left child");

            let root = sentinel_node.right_child;
            if let Some(root) = root {
                assert_eq!(self.get_node(root).parent, Some(sentinel));
            }

            let mut in_order = Vec::new();
            self.collect_in_order(root, &mut in_order);
            tree_levels += in_order.len();

            for pair in in_order.windows(2) {
                assert!(
                    self.limit(pair[0]).price < self.limit(pair[1]).price,
                    "BST order violated on the {side} side"
                );
            }

            for &index in &in_order {
                let limit = self.limit(index);
                let node = self.get_node(index);
                assert_eq!(limit.side, side);
                assert!(!limit.is_empty(), "empty level left in tree");
                assert_eq!(self.price_index.get(&limit.price), Some(&index));

                assert_eq!(node.height, self.computed_height(Some(index)));
                assert!(
                    self.balance_factor(index).abs() <= 1,
                    "AVL balance violated at price {}",
                    limit.price
                );
                if let Some(left) = node.left_child {
                    assert_eq!(self.get_node(left).parent, Some(index));
                }
                if let Some(right) = node.right_child {
                    assert_eq!(self.get_node(right).parent, Some(index));
                }

                queued_orders += self.check_queue(index);
            }

            let expected_best = root.map(|root| match side {
                Side::Bid => self.subtree_max(root),
                Side::Ask => self.subtree_min(root),
            });
            assert_eq!(best, expected_best, "stale best cache on the {side} side");
        }

        assert_eq!(self.price_index.len(), tree_levels);
        assert_eq!(self.order_index.len(), queued_orders);
    }

    /// Walk one level's FIFO, asserting link and aggregate consistency.
    /// Returns the number of queued orders.
    fn check_queue(&self, limit_index: usize) -> usize {
        let limit = self.limit(limit_index);
        let mut count = 0;
        let mut total: Quantity = 0;
        let mut prev = None;
        let mut current = limit.queue.head;
        while let Some(order_index) = current {
            let order = self.orders[order_index].as_ref().unwrap();
            assert_eq!(order.prev, prev);
            assert_eq!(order.parent_limit, Some(limit_index));
            assert_eq!(order.price, limit.price);
            assert_eq!(order.side, limit.side);
            assert_eq!(self.order_index.get(&order.uid), Some(&order_index));
            count += 1;
            total += order.size;
            prev = current;
            current = order.next;
        }
        assert_eq!(limit.queue.tail, prev);
        assert_eq!(limit.queue.count, count);
        assert_eq!(limit.size, total);
        count
    }

    fn collect_in_order(&self, index: Option<usize>, out: &mut Vec<usize>) {
        if let Some(index) = index {
            let node = self.get_node(index);
            self.collect_in_order(node.left_child, out);
            out.push(index);
            self.collect_in_order(node.right_child, out);
        }
    }

    fn computed_height(&self, index: Option<usize>) -> i32 {
        match index {
            None => 0,
            Some(index) => {
                let node = self.get_node(index);
                1 + self
                    .computed_height(node.left_child)
                    .max(self.computed_height(node.right_child))
            }
        }
    }
}
