//! # costline-hooks
//!
//! The boundary between the host agent runtime and the attribution service.
//!
//! The host invokes a hook command per lifecycle event and a status command
//! per render tick, each with a JSON payload on stdin. This crate decodes
//! those payloads once into closed types ([`HookEvent`], [`StatusInput`])
//! and routes them into an
//! [`AttributionService`](costline_attribution::AttributionService).
//!
//! ## Fail-Open
//!
//! [`handle_hook`] never returns an error and [`handle_status`] always
//! returns a breakdown. Undecodable payloads are logged and dropped.

#![deny(unsafe_code)]

pub mod dispatch;
pub mod errors;
pub mod types;

pub use dispatch::{dispatch, handle_hook, handle_status};
pub use errors::{HookError, Result};
pub use types::{HookAction, HookEvent, StatusInput};
