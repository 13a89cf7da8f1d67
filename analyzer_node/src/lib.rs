//! SmartScribe analysis node.
//!
//! Server-side core for AI-assisted Ethereum smart contract analysis:
//! resolves contract source from a block explorer, drives an LLM provider
//! with retry/backoff, normalizes the analysis into a canonical report,
//! and computes structured diffs between two reports. The market module
//! proxies a third-party market data API behind an in-memory TTL cache.

pub mod ai;
pub mod api;
pub mod comparison;
pub mod config;
pub mod explorer;
pub mod market;
pub mod orchestrator;
pub mod retry;
