//! TV channel and program metadata store
//!
//! Applications address channels, programs and watch history through
//! `content://tvstore/...` identifiers. [`TvStore`] routes each request,
//! scopes it to the calling application, runs it against SQLite and
//! reports changed identifiers to a [`notifications::ChangeNotifier`].

pub mod assets;
pub mod caller;
pub mod config;
pub mod contract;
pub mod database;
pub mod errors;
pub mod genres;
pub mod logo_assets;
pub mod models;
pub mod notifications;
pub mod provider;
pub mod routing;
pub mod services;
pub mod values;

pub use caller::Caller;
pub use config::Config;
pub use contract::ResourceUri;
pub use errors::{AppError, AppResult, LogoError, RequestError};
pub use provider::{BatchOperation, OperationResult, QueryRequest, TvStore};
pub use routing::Selection;
pub use values::{ContentValues, Record, SqlValue};
