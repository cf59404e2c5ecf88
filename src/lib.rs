//! # Lumen Client
//!
//! A client for the Lumen database of takedown notices.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Query parameters, notices and search results
//! - [`api`]: Request manager, paginated search, transports and parsing
//! - [`utils`]: Response cache, rate limiter and retry helper
//! - [`config`]: Configuration management

pub mod api;
pub mod config;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use api::{ClientError, FetchStrategy, LaunchSpacing, PaginatedSearch, RequestManager};
pub use models::{Notice, ParamBuilder, SearchData, Sort, Topic};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
