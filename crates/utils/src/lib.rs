//! Shared utilities for lazyclean
//!
//! This crate provides the background runtime the cleanup worker is
//! scheduled on and the logging setup used by binaries and tests.

pub mod async_runtime;
pub mod tracing;

pub use async_runtime::*;
