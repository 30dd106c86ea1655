//! Mirror Sync - Model-to-client adapter synchronization.
//!
//! This crate keeps a tree of mutable server-side model objects mirrored,
//! incrementally and in order, in a remote client through a batched
//! request/response message protocol.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
