//! # beacon-api
//!
//! REST client for the Beacon emergency backend.
//!
//! This crate provides:
//! - [`ApiClient`] - an authenticated HTTP client with a bounded request
//!   timeout
//! - SOS delivery (`POST /api/sos`) and alert fetching (`GET /api/alerts`)
//! - An error taxonomy that separates authorization failures from
//!   transient network faults, which the sync engines treat differently
//! - Bearer credential plumbing via [`TokenProvider`], with optional
//!   at-rest storage in the system keyring

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod alerts;
mod client;
mod error;
mod sos;
mod token;

pub use alerts::fetch_alerts;
pub use client::{ApiClient, REQUEST_TIMEOUT};
pub use error::{ApiError, ApiResult};
pub use sos::{SosRequestBody, SosResponse, create_sos};
pub use token::{KeyringTokenStore, StaticToken, TokenProvider};
