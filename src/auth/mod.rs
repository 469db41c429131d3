//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Google ID token verification
//! - Account resolution (create, link, or return the local account)
//! - Session token issuance and validation
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod resolver;
pub mod routes;
pub mod service;
pub mod session;
pub mod validators;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;


pub use routes::auth_routes;
