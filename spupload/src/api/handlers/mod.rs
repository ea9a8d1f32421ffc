//! Axum route handlers.
//!
//! Handlers parse the request, hand off to [`crate::upload`], and map failures through
//! [`crate::errors::Error`].

pub mod upload;
