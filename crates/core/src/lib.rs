//! PureStream Core - Canonical order model.
//!
//! This crate provides the shared order types used across all PureStream
//! sync components:
//! - `sync` - Order normalization and synchronization engine
//! - consuming views (customer order history, admin order console)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no
//! normalization logic. A [`types::Order`] here is always the *canonical*
//! representation: every field populated, financial totals derived, status
//! lower-cased. Turning a loosely-structured source record into one of
//! these is the sync engine's job.
//!
//! # Modules
//!
//! - [`types`] - Canonical order, item, address, status, and event types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
