//! # costline-core
//!
//! Foundation types and the attribution state machine for costline.
//!
//! This crate provides the vocabulary every other costline crate depends on:
//!
//! - **Branded IDs**: [`SessionId`] as a newtype for type safety
//! - **Contexts**: [`ContextKind`] and per-context [`ContextTotals`]
//! - **Context tracking**: [`ContextTracker`], driven by enter/exit/reset events
//! - **Checkpoint ledger**: [`CheckpointLedger`], which records cumulative-cost
//!   observations and recomputes the per-context breakdown from scratch
//! - **Session state**: [`SessionState`], the persisted per-session record
//! - **Breakdown**: [`Breakdown`], the payload handed to the status display
//! - **Clock**: [`Clock`] trait so timestamps can be pinned in tests
//! - **Logging**: `tracing` subscriber setup and test capture helpers

#![deny(unsafe_code)]

pub mod breakdown;
pub mod clock;
pub mod constants;
pub mod context;
pub mod ids;
pub mod ledger;
pub mod logging;
pub mod state;
pub mod tracker;

pub use breakdown::{Activity, Breakdown};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{ContextKind, ContextTotals};
pub use ids::SessionId;
pub use ledger::{Checkpoint, CheckpointLedger};
pub use state::SessionState;
pub use tracker::{ContextSnapshot, ContextTracker};
