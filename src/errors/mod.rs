//! Centralized error handling for the TV metadata store
//!
//! # Error Categories
//!
//! - **Request Errors**: unknown identifiers, disallowed filters, non-canonical
//!   genres. Raised synchronously before any storage access.
//! - **Database Errors**: sqlx failures, including rolled back batches
//! - **Logo Errors**: the one asynchronous failure a logo writer gets to see
//! - **Genre Mapping Errors**: broken bundled tables, fatal at startup
//!
//! # Usage
//!
//! ```rust
//! use tv_store::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for request validation Results
pub type RequestResult<T> = Result<T, RequestError>;

/// Convenience type alias for logo ingestion Results
pub type LogoResult<T> = Result<T, LogoError>;
