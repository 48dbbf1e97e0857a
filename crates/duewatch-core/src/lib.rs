//! Core types and trait definitions for duewatch.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! scheduler depends on the traits in [`store`] and [`remote`]; backends and
//! clients implement them in their own crates.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod assignment;
pub mod credential;
pub mod error;
pub mod notification;
pub mod remote;
pub mod store;

pub use error::{Error, Result};

/// Internal identifier of a user row in the credential store.
pub type UserId = i64;
