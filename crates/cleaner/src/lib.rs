//! Deferred, at-most-once cleanup of resources that wrap external state.
//!
//! A [`Cleaner`] associates an owner with a cleanup action. The action runs
//! exactly once: either when the caller asks for it through the returned
//! [`Cleanable`], or, as a safety net, after the owner has been dropped
//! without that happening. The action is told which of the two it was.
//!
//! ## Key Components
//!
//! - **`registry`**: [`Cleaner`], the pending registrations and the queue of
//!   owners that went away.
//! - **`worker`** and **`blocker`**: the background task that drains that
//!   queue. It runs on a shared multi-thread runtime only while something is
//!   pending and waits cooperatively, so it never pins a pool thread.
//! - **`tracked`**: [`Tracked`], the owner type whose last drop is reported
//!   to the registry.
//! - **`spool`**: [`SpooledBuffer`], a consumer that registers the temp file
//!   it spills to.
//! - **`timer`**: [`SharedTimer`], a reference-counted timer that registers
//!   its thread on first use and cleans it when the last consumer lets go.
//!
//! ## Example
//!
//! ```no_run
//! use lazyclean::{BoxError, Cleaner, Tracked};
//!
//! let owner = Tracked::new(());
//! let handle = Cleaner::global().register(&owner, |leak: bool| {
//!     if leak {
//!         eprintln!("resource leaked");
//!     }
//!     Ok::<(), BoxError>(())
//! });
//!
//! // Explicit release path.
//! handle.clean().expect("cleanup failed");
//! ```

mod blocker;
mod config;
mod handle;
mod list;
mod node;
mod registry;
mod spool;
mod timer;
mod tracked;
mod worker;

pub use config::CleanerConfig;
pub use handle::Cleanable;
pub use lazyclean_core::{BoxError, Error, Result};
pub use node::CleaningAction;
pub use registry::Cleaner;
pub use spool::SpooledBuffer;
pub use timer::{SharedTimer, Timer, TimerTask};
pub use tracked::Tracked;
