//! HTTP layer.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: request/response types
//!
//! The upload endpoint is `POST /api/upload`. Its OpenAPI document is served at
//! `/api/openapi.json` and rendered at `/api/docs`.

pub mod handlers;
pub mod models;
