//! imgdepot Server - HTTP API for image uploads and static file serving
//!
//! Clients upload images for an article as base64 data URIs or compact
//! URL-safe tokens; the server writes them under the storage root and serves
//! them back.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public
//!
//! - `GET /` - landing page
//! - `GET /health` - liveness with storage status
//! - `GET /images/*` - article images
//! - `GET /storage/*` - the whole public storage tree
//! - `GET /api/public-file/{article_id}/{filename}` - one stored file
//!
//! ## Protected (`x-client-name` + `Authorization: Bearer <token>`)
//!
//! - `POST /api/articles/{article_id}/process-images` - replace an article's images

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::{ClientIdentity, CredentialStore, SharedTokens};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, init_tracing, start_server};
pub use state::ServerState;
