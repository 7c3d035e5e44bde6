//! # lob
//!
//! An in-memory limit order book for high-frequency trading, based on
//! WK Selph's classic design: per-side AVL trees of price levels whose
//! nodes are intrusive FIFO queues of orders, cross-indexed by order id
//! and by price, with cached best bid and best ask.
//!
//! ## Core components
//!
//! - [`Order`]: value-typed order message fed to the book
//! - [`OrderNode`]: a resting order, one link in its level's FIFO
//! - [`Limit`]: price level owning a FIFO of orders (AVL tree node)
//! - [`OrderBook`]: the book; two trees, two indices, top-level API
//!
//! ## Performance characteristics
//!
//! - Add: O(log M) for the first order at a price level, O(1) after
//! - Cancel: O(1), plus O(log M) when the level empties
//! - Update: O(1)
//! - Best bid / best ask, volume at price: O(1)
//!
//! Where M is the number of price levels (typically << N orders).
//!
//! The book is a pure data structure: it holds resting orders and answers
//! market-data queries. Matching, feed decoding, and persistence are the
//! caller's concern.

pub mod limit;
pub mod order;
pub mod orderbook;
pub mod types;

pub(crate) mod avl_tree;

pub use limit::Limit;
pub use order::{Order, OrderNode};
pub use orderbook::{LevelOrders, LevelView, OrderBook};
pub use types::{OrderId, Price, Quantity, Side, Timestamp};


use thiserror::Error;

/// Result type for order book operations.
pub type Result<T> = std::result::Result<T, OrderBookError>;

/// Errors that can occur during order book operations.
///
/// A cancel for an unknown id is not an error: feeds cancel
/// speculatively, so [`OrderBook::remove`] reports it as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrderBookError {
    /// Order with this id is already resting in the book
    #[error("order {0} already exists")]
    DuplicateOrder(OrderId),
    /// No resting order with this id
    #[error("order {0} not found")]
    OrderNotFound(OrderId),
    /// Price must be a positive tick count
    #[error("invalid price: {0}")]
    InvalidPrice(Price),
    /// Size must be positive here (zero sizes are cancels, handled by
    /// [`OrderBook::process`])
    #[error("invalid size: {0}")]
    InvalidSize(Quantity),
    /// Updates may not change an order's side or price; cancel and
    /// re-add under a fresh id instead
    #[error("order {0} update may not change side or price")]
    UpdateMismatch(OrderId),
}
