//! # Client Components
//!
//! The relay side is split the same way as any caller would layer it:
//!
//! ## Core Client ([`client`])
//! [`VoteRelayClient`] delivers exactly one vote per call over a fresh
//! connection and turns every failure into a [`VoteOutcome`](crate::common::vote::VoteOutcome).
//!
//! ## Dispatcher ([`middleware`])
//! [`VoteDispatcher`] owns the caller-side concerns:
//! - Retry of transport failures with jittered delays
//! - Cancellation across attempts
//! - Scheduling a vote as an independent task
//! - Metrics recording
//!
//! ## Metrics ([`metrics`])
//! [`RelayMetrics`] aggregates attempt outcomes and exports them as JSON.

pub mod client;
pub mod metrics;
pub mod middleware;

pub use client::VoteRelayClient;
pub use metrics::RelayMetrics;
pub use middleware::{DispatchReport, VoteDispatcher};
