//! Veiltable domain types.
//!
//! Defines session/participant/sealed-state types, the capability table, and the
//! transaction/event envelope shared by the execution layer and its embedders.

pub mod execution;
pub mod wager;

pub use execution::{
    Account, Event, Instruction, Key, Output, Transaction, Value, NAMESPACE,
};
