//! Simulated trading agents for a single-symbol book.
//!
//! The bots drive the engine directly through a shared [`ThrottledClient`]
//! and exist to keep a demo book lively: random makers on both sides plus
//! a spread-capture quoter, orchestrated by a [`Supervisor`] that tracks
//! the swarm's PnL.

pub mod client;
pub mod supervisor;
pub mod traders;

pub use client::ThrottledClient;
pub use supervisor::Supervisor;
pub use traders::{mid_price, RandomQuoteBot, SpreadCaptureBot};
