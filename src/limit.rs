//! Price level: an AVL tree node owning a FIFO queue of orders.

use crate::avl_tree::AvlNode;
use crate::order::OrderNode;
use crate::types::{Price, Quantity, Side};
use std::fmt;

/// Intrusive FIFO bookkeeping for one price level.
///
/// Holds the head/tail arena indices and the order count; the links
/// themselves live inside the [`OrderNode`]s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct OrderQueue {
    /// First (oldest) order in the queue
    pub(crate) head: Option<usize>,
    /// Last (newest) order in the queue
    pub(crate) tail: Option<usize>,
    /// Number of orders in the queue
    pub(crate) count: usize,
}

/// A price level in the book.
///
/// Each limit aggregates all resting orders at one price on one side. The
/// level sits in its side's AVL tree via the embedded [`AvlNode`] linkage
/// and owns a FIFO of orders in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    /// The price for this level
    pub price: Price,
    /// Aggregate size: sum of the remaining sizes of all queued orders
    pub size: Quantity,
    /// Which side's tree this level belongs to
    pub(crate) side: Side,
    /// AVL tree linkage
    pub(crate) avl: AvlNode,
    /// FIFO queue bookkeeping
    pub(crate) queue: OrderQueue,
}

impl Limit {
    /// Create a new level seeded with its first order's size.
    ///
    /// The seed order itself is linked in by the caller via
    /// [`Limit::push_order`], which leaves the aggregate untouched for the
    /// first order.
    pub(crate) fn new(price: Price, side: Side, seed: Quantity) -> Self {
        Self {
            price,
            size: seed,
            side,
            avl: AvlNode::new(),
            queue: OrderQueue::default(),
        }
    }

    /// Create a tree root sentinel. Sentinels carry no orders and never
    /// appear in the price index; their single right-child slot holds the
    /// real root of the side's tree.
    pub(crate) fn sentinel(side: Side) -> Self {
        Self {
            price: 0,
            size: 0,
            side,
            avl: AvlNode::sentinel(),
            queue: OrderQueue::default(),
        }
    }

    /// Check if this level has no orders.
    pub fn is_empty(&self) -> bool {
        self.queue.count == 0
    }

    /// Number of orders queued at this level.
    pub fn order_count(&self) -> usize {
        self.queue.count
    }

    /// Notional volume at this level: `price * size`.
    pub fn volume(&self) -> u128 {
        self.price as u128 * self.size as u128
    }

    /// Append an order at the tail of this level's FIFO.
    ///
    /// The first order only establishes head/tail; its size was already
    /// seeded through the constructor. Subsequent appends link behind the
    /// stored tail in O(1) and grow the aggregate.
    pub(crate) fn push_order(
        &mut self,
        orders: &mut [Option<OrderNode>],
        self_index: usize,
        order_index: usize,
    ) {
        orders[order_index].as_mut().unwrap().parent_limit = Some(self_index);

        match self.queue.tail {
            None => {
                self.queue.head = Some(order_index);
                self.queue.tail = Some(order_index);
                self.queue.count = 1;
            }
            Some(tail_index) => {
                orders[tail_index].as_mut().unwrap().next = Some(order_index);
                orders[order_index].as_mut().unwrap().prev = Some(tail_index);
                self.queue.tail = Some(order_index);
                self.queue.count += 1;
                self.size += orders[order_index].as_ref().unwrap().size;
            }
        }
    }

    /// Unlink an order from this level's FIFO and shrink the aggregate.
    ///
    /// The node is left fully detached and safe to discard.
    pub(crate) fn unlink_order(&mut self, orders: &mut [Option<OrderNode>], order_index: usize) {
        let (prev, next, size) = {
            let order = orders[order_index].as_ref().unwrap();
            (order.prev, order.next, order.size)
        };

        match prev {
            Some(prev_index) => orders[prev_index].as_mut().unwrap().next = next,
            None => self.queue.head = next,
        }
        match next {
            Some(next_index) => orders[next_index].as_mut().unwrap().prev = prev,
            None => self.queue.tail = prev,
        }

        debug_assert!(self.queue.count > 0, "unlink from an empty queue");
        debug_assert!(self.size >= size, "aggregate smaller than unlinked order");
        self.queue.count -= 1;
        self.size -= size;

        let order = orders[order_index].as_mut().unwrap();
        order.prev = None;
        order.next = None;
        order.parent_limit = None;
    }

    /// Adjust the aggregate when a queued order's size changes in place.
    pub(crate) fn adjust_size(&mut self, old_size: Quantity, new_size: Quantity) {
        if new_size >= old_size {
            self.size += new_size - old_size;
        } else {
            debug_assert!(self.size >= old_size - new_size, "aggregate underflow");
            self.size -= old_size - new_size;
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Limit[{}]: {} orders, size {}, volume {}",
            self.price,
            self.queue.count,
            self.size,
            self.volume()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Order;

    fn node(uid: u64, size: Quantity, price: Price) -> Option<OrderNode> {
        Some(OrderNode::new(&Order::new(uid, Side::Bid, size, price), 0))
    }

    #[test]
    fn test_seeded_level() {
        let limit = Limit::new(5000, Side::Bid, 100);
        assert_eq!(limit.price, 5000);
        assert_eq!(limit.size, 100);
        assert_eq!(limit.order_count(), 0);
        assert!(limit.is_empty());
        assert_eq!(limit.volume(), 500_000);
    }

    #[test]
    fn test_push_and_unlink_maintain_fifo() {
        let mut orders = vec![node(1, 100, 5000), node(2, 50, 5000), node(3, 25, 5000)];
        let mut limit = Limit::new(5000, Side::Bid, 100);

        limit.push_order(&mut orders, 0, 0);
        assert_eq!(limit.size, 100);
        assert_eq!(limit.queue.head, Some(0));
        assert_eq!(limit.queue.tail, Some(0));

        limit.push_order(&mut orders, 0, 1);
        limit.push_order(&mut orders, 0, 2);
        assert_eq!(limit.size, 175);
        assert_eq!(limit.order_count(), 3);
        assert_eq!(orders[0].as_ref().unwrap().next, Some(1));
        assert_eq!(orders[2].as_ref().unwrap().prev, Some(1));
        assert_eq!(limit.queue.tail, Some(2));

        // unlink the middle order; head and tail stay put
        limit.unlink_order(&mut orders, 1);
        assert_eq!(limit.size, 125);
        assert_eq!(limit.order_count(), 2);
        assert_eq!(orders[0].as_ref().unwrap().next, Some(2));
        assert_eq!(orders[2].as_ref().unwrap().prev, Some(0));

        // unlink the head; the tail order becomes the head
        limit.unlink_order(&mut orders, 0);
        assert_eq!(limit.queue.head, Some(2));
        assert_eq!(limit.queue.tail, Some(2));
        assert_eq!(orders[2].as_ref().unwrap().prev, None);

        limit.unlink_order(&mut orders, 2);
        assert!(limit.is_empty());
        assert_eq!(limit.size, 0);
        assert_eq!(limit.queue.head, None);
        assert_eq!(limit.queue.tail, None);
    }

    #[test]
    fn test_adjust_size() {
        let mut limit = Limit::new(5000, Side::Bid, 100);
        limit.adjust_size(100, 150);
        assert_eq!(limit.size, 150);
        limit.adjust_size(150, 75);
        assert_eq!(limit.size, 75);
        limit.adjust_size(75, 75);
        assert_eq!(limit.size, 75);
    }
}
