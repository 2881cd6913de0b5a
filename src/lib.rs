//! Verifies the output trace of a limit-order matching engine against the
//! command stream it was fed.
//!
//! The engine under test may be concurrent; the verifier imposes one total
//! order on its trace (output timestamp, stable on ties) and checks that
//! this order is a legal sequence of price-time-priority transitions.

pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod instrument;
pub mod normalize;
pub mod orderbook;
pub mod orders;
pub mod report;
pub mod trace;
pub mod verifier;

pub use config::VerifierConfig;
pub use errors::{FixtureError, Violation};
pub use verifier::{Verdict, Verifier, verify};
