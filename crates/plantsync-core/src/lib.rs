//! Plantsync Core Types and Definitions
//!
//! This crate provides the bookkeeping model shared by the Plantsync library
//! and CLI. It includes:
//!
//! - **Markers**: Per-file attribute records linking a diagram source to its
//!   rendered target ([`marker::Marker`])
//! - **Attribute values**: The small set of value types a marker can hold
//!   ([`marker::AttributeValue`])
//! - **Stores**: The [`store::MarkerStore`] capability with in-memory and
//!   TOML-file implementations

pub mod error;
pub mod marker;
pub mod store;

pub use error::MarkerError;
