//! Reconcile module - Driving one object from its live state to its desired
//! definition.
//!
//! The [`Reconciler`] fetches the live object, creates it when missing, and
//! otherwise computes and sends the smallest patch that converges it. The
//! remote store is reached through the [`ResourceClient`] trait.

mod client;
mod reconciler;


pub use client::*;
pub use reconciler::*;
