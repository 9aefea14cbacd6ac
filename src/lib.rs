//! commitguard library crate
//!
//! Exposes the guard's modules so integration tests and external tooling can
//! exercise the pipeline without going through CLI startup.

pub mod apply;
pub mod config;
pub mod confirm;
pub mod detect;
pub mod diff;
pub mod editor;
pub mod fix;
pub mod git_ops;
pub mod review;
pub mod rules;
pub mod session;
