//! HTTP retrieval endpoint compatible with the Dify external knowledge API.
//!
//! `POST /retrieval` authenticates the bearer key, checks the knowledge id,
//! derives a project filter from the first metadata condition and answers
//! with the store's ranked chunks above the requested score threshold.

pub mod api;
pub mod error;
pub mod server;

pub use error::GatewayError;
pub use server::{router, serve, GatewayState};
