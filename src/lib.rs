//! Bankfeed: a gateway between a financial-data aggregation API and a
//! client application. Exchanges tokens, syncs paged transaction windows,
//! persists records per user, and re-exports them as CSV.

pub mod auth;
pub mod config;
pub mod export;
pub mod http;
pub mod models;
pub mod remote;
pub mod report;
pub mod store;
pub mod sync;
