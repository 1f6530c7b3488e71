//! Haberdash Core - Shared types library.
//!
//! This crate provides common types used across all Haberdash components:
//! - `checkout` - Public checkout service
//! - `admin` - Operator console service
//! - `cli` - Command-line probes and tools
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
