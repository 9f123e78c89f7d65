//! # costline-attribution
//!
//! The façade instrumentation call sites and the status display talk to.
//!
//! Every entry point is one load → mutate → save cycle against a
//! [`StateStore`](costline_store::StateStore):
//!
//! - [`AttributionService::on_tool_start`] / [`on_tool_end`] drive the
//!   context tracker from tool lifecycle events
//! - [`AttributionService::on_subagent_stop`] force-resets to the primary
//!   context when a sub-agent's matching tool end was lost
//! - [`AttributionService::observe_cost`] records a cumulative-cost
//!   observation and returns the recomputed [`Breakdown`](costline_core::Breakdown)
//!
//! ## Fail-open
//!
//! No entry point returns an error or panics. Store failures are logged and
//! degrade to a fresh state (on load) or a dropped write (on save), so
//! instrumentation never disrupts the host agent.
//!
//! [`on_tool_end`]: AttributionService::on_tool_end

#![deny(unsafe_code)]

pub mod config;
pub mod service;
pub mod tools;

pub use config::ServiceConfig;
pub use service::AttributionService;
pub use tools::ToolKind;
