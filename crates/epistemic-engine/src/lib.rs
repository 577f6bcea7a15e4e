// epistemic-engine/src/lib.rs
// ============================================================================
// Module: Epistemic Engine
// Description: The composition root. Owns one instance of every domain
// store and exposes a single `dispatch(domain, name, input)` entry point
// translating wire-level JSON calls into real store operations.
// Dependencies: every other workspace crate
// ============================================================================

//! ## Overview
//! This crate has no opinions of its own about knowledge, scheduling,
//! skills, projects, coordination, constitutional rules, or sandboxing —
//! it only wires those domains' stores together behind one [`EngineContext`]
//! and one [`registry::dispatch`] entry point, so a caller (an RPC server,
//! a CLI, an embedding host) can issue `(domain, name, payload)` calls
//! without depending on every domain crate directly.

pub mod context;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod result;

pub use context::EngineContext;
pub use error::DispatchError;
pub use registry::OPERATIONS;
pub use registry::OperationDescriptor;
pub use registry::dispatch;
pub use result::OperationResult;
