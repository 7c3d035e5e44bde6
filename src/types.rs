//! Core types shared across the order book.

use std::fmt;

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

/// Unique identifier for orders.
pub type OrderId = u64;

/// Price in integer ticks (e.g. cents). Using an integer type avoids
/// floating point precision issues in financial calculations; tick scaling
/// is the caller's responsibility.
pub type Price = u64;

/// Order size in integer units.
pub type Quantity = u64;

/// Opaque timestamp for order entry times.
pub type Timestamp = u64;

/// Order side (bid or ask).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub enum Side {
    /// Buy order (bid)
    Bid,
    /// Sell order (ask)
    Ask,
}

impl Side {
    /// Returns true if this is the bid side.
    pub fn is_bid(&self) -> bool {
        matches!(self, Side::Bid)
    }

    /// Returns true if this is the ask side.
    pub fn is_ask(&self) -> bool {
        matches!(self, Side::Ask)
    }

    /// Returns the opposite side.
    pub fn opposite(&self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "Bid"),
            Side::Ask => write!(f, "Ask"),
        }
    }
}
