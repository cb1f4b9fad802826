//! Riptide: a personal RSS feed aggregator.
//!
//! Downloads configured feeds, serves a merged view of them, and serves
//! static assets — all through an in-memory content cache ([`cache`]) with
//! time-based revalidation and SHA-256 integrity tags for conditional GET.

pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod http_retry;
pub mod metrics;
pub mod render;
pub mod server;
