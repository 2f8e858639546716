//! Veiltable execution layer.
//!
//! This crate contains the deterministic operation execution logic (`Layer`)
//! for confidential wagering sessions: admission, sealed-state custody, turn
//! actions, reveals, and teardown.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution.
//! - Do not use non-deterministic randomness; only derive randomness from the
//!   provided seed.
//! - Avoid iteration order of hash-based collections influencing outputs.
//!
//! ## Atomicity
//! Every public operation validates fully before its first write, so a
//! rejected operation leaves pot, phase, and logs unchanged. Writes buffer in
//! the layer's pending overlay and only reach the backing state when the
//! caller applies [`Layer::commit`]. The single deliberate exception is a
//! refund transfer failing mid-teardown: refunds that already moved stay
//! recorded, the session stays un-`Closed`, and the failure is reported.
//!
//! The primary entrypoint is [`Layer`].

mod error;
mod layer;
mod state;

pub mod engine;
pub mod escrow;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use engine::{EngineError, SealedEngine, SealedOp};
pub use error::{ErrorKind, WagerError};
pub use escrow::{Escrow, TransferError};
pub use layer::Layer;
pub use state::{nonce, Adb, PrepareError, State, Status};

#[cfg(any(test, feature = "mocks"))]
pub use engine::MockEngine;
#[cfg(any(test, feature = "mocks"))]
pub use escrow::MockVault;
#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;
