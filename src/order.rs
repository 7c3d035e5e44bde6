//! Order record and the resting order node.

use crate::types::{OrderId, Price, Quantity, Side, Timestamp};
use std::fmt;

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

/// Value-typed order message handed to [`OrderBook::process`].
///
/// A size of zero is a cancel for the given id. If no timestamp is given,
/// the book stamps the order from its own clock on entry.
///
/// [`OrderBook::process`]: crate::OrderBook::process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct Order {
    /// Unique identifier for this order
    pub uid: OrderId,
    /// Bid or Ask
    pub side: Side,
    /// Order size; zero means cancel
    pub size: Quantity,
    /// Limit price in ticks
    pub price: Price,
    /// Entry time; assigned by the book when absent
    pub timestamp: Option<Timestamp>,
}

impl Order {
    /// Create a new order record without an explicit timestamp.
    pub fn new(uid: OrderId, side: Side, size: Quantity, price: Price) -> Self {
        Self {
            uid,
            side,
            size,
            price,
            timestamp: None,
        }
    }

    /// Create a new order record carrying its own entry timestamp.
    pub fn with_timestamp(
        uid: OrderId,
        side: Side,
        size: Quantity,
        price: Price,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            uid,
            side,
            size,
            price,
            timestamp: Some(timestamp),
        }
    }

    /// Check if this is a bid.
    pub fn is_bid(&self) -> bool {
        self.side.is_bid()
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order[{}]: {} {} @ {}",
            self.uid, self.side, self.size, self.price
        )
    }
}

/// A resting order: one link in a price level's intrusive FIFO.
///
/// The `prev`/`next` fields are arena indices into the book's order pool,
/// and `parent_limit` points back at the owning price level. None of the
/// links own anything; the level owns its queue of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderNode {
    /// Unique identifier for this order
    pub uid: OrderId,
    /// Bid or Ask
    pub side: Side,
    /// Remaining size
    pub size: Quantity,
    /// Limit price in ticks
    pub price: Price,
    /// Time the order entered the book
    pub entry_time: Timestamp,
    /// Next order in the FIFO (None if tail)
    pub(crate) next: Option<usize>,
    /// Previous order in the FIFO (None if head)
    pub(crate) prev: Option<usize>,
    /// Owning price level
    pub(crate) parent_limit: Option<usize>,
}

impl OrderNode {
    /// Create an unlinked node from an order record.
    pub(crate) fn new(order: &Order, entry_time: Timestamp) -> Self {
        Self {
            uid: order.uid,
            side: order.side,
            size: order.size,
            price: order.price,
            entry_time,
            next: None,
            prev: None,
            parent_limit: None,
        }
    }

    /// Check if this is a bid.
    pub fn is_bid(&self) -> bool {
        self.side.is_bid()
    }

    /// The node's data as a value-typed order record.
    pub fn record(&self) -> Order {
        Order::with_timestamp(self.uid, self.side, self.size, self.price, self.entry_time)
    }
}

impl fmt::Display for OrderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order[{}]: {} {} @ {} (entered: {})",
            self.uid, self.side, self.size, self.price, self.entry_time
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_record() {
        let order = Order::new(1, Side::Bid, 100, 5000);
        assert_eq!(order.uid, 1);
        assert_eq!(order.side, Side::Bid);
        assert_eq!(order.size, 100);
        assert_eq!(order.price, 5000);
        assert_eq!(order.timestamp, None);
        assert!(order.is_bid());
    }

    #[test]
    fn test_node_round_trips_record() {
        let order = Order::new(7, Side::Ask, 25, 310);
        let node = OrderNode::new(&order, 42);
        assert_eq!(node.entry_time, 42);
        assert_eq!(node.prev, None);
        assert_eq!(node.next, None);
        assert_eq!(node.parent_limit, None);

        let record = node.record();
        assert_eq!(record.uid, 7);
        assert_eq!(record.size, 25);
        assert_eq!(record.timestamp, Some(42));
    }
}
