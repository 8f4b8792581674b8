#![forbid(unsafe_code)]

//! Public entry point for the vidshare backend crate.
//!
//! The binary in `src/bin/backend.rs` only wires configuration, logging and
//! the listener; everything a request touches lives in these modules so it can
//! be exercised from tests without a socket.

pub mod api;
pub mod config;
pub mod error;
pub mod ids;
pub mod media;
pub mod response;
pub mod security;
pub mod services;
pub mod store;
pub mod views;
