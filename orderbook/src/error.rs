//! Error taxonomy for book commands.

use thiserror::Error;

/// Errors returned synchronously by book commands.
///
/// A failed command leaves the book untouched and emits no events. None of
/// these are fatal to the worker; it services the next command normally.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BookError {
    #[error("order symbol {symbol} does not match book {expected}")]
    SymbolMismatch { symbol: String, expected: String },

    #[error("order quantity must be positive")]
    InvalidQuantity,

    #[error("price must be a positive multiple of tick size {tick_size}")]
    TickAlignment { tick_size: i64 },

    #[error("order {id} not found")]
    NotFound { id: String },

    #[error("order {id} is already resting")]
    DuplicateId { id: String },

    #[error("book is stopped")]
    Stopped,
}
