//! Boundary to the external advisory services.
//!
//! # Responsibility
//! - Define the request/response contracts of the proposal-analysis and
//!   installation-catalog services.
//! - Provide in-process implementations usable offline and in tests.
//!
//! # Invariants
//! - Advisory calls never mutate a project; callers record their outcome
//!   through the engine afterwards.
//! - Failures are reported, never retried here.

pub mod analysis;
pub mod catalog;
