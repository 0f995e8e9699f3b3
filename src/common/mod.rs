//! # Common Components
//!
//! Shared building blocks used by both the relay client and the vote listener.
//!
//! ## Modules
//!
//! - [`vote`]: Vote targets, voters, the v1 vote packet and the outcome record
//! - [`crypto`]: RSA key parsing, generation and the PKCS#1 v1.5 block cipher
//! - [`connection`]: Transport abstraction and fixed-size block framing
//! - [`config`]: Configuration parsing utilities
//! - [`error`]: Error types and the public failure taxonomy
//! - [`logging`]: Logger setup shared by the binaries

pub mod config;
pub mod connection;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod vote;
