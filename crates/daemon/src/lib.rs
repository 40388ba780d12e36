//! # Burrow Daemon Library
//!
//! This crate provides the server side of Burrow, a small HTTP file store
//! that exposes a single directory tree (the storage root) to clients.
//!
//! ## Overview
//!
//! Every request path is interpreted relative to the storage root, and the
//! HTTP method together with what currently exists at that path selects one
//! operation:
//!
//! | Method   | Target              | Operation                      |
//! |----------|---------------------|--------------------------------|
//! | `GET`    | directory or root   | JSON listing                   |
//! | `GET`    | anything else       | streamed download              |
//! | `PUT`    | file path           | streamed upload (overwrite)    |
//! | `HEAD`   | file path           | size and modification headers  |
//! | `DELETE` | file or directory   | removal (recursive)            |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Server                           │
//! │              (listener, graceful shutdown)               │
//! ├──────────────────────────────────────────────────────────┤
//! │                         Router                           │
//! │          (method + path kind -> operation)               │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │  Browser   │  │   Transfer   │  │     Remover      │  │
//! │  └────────────┘  └──────────────┘  └──────────────────┘  │
//! │                     StorageRoot                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daemon::{shutdown_signal, Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!     config.validate()?;
//!
//!     let server = Server::bind(&config).await?;
//!     println!("listening on {}", server.local_addr());
//!     server.serve(shutdown_signal()).await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`files`]: Path resolution and filesystem operations
//! - [`router`]: HTTP dispatch and error mapping
//! - [`server`]: Listener lifecycle and shutdown

pub mod config;
pub mod files;
pub mod router;
pub mod server;

pub use config::{Config, ConfigError};
pub use files::{FileError, ResolvedPath, StorageRoot};
pub use router::{create_router, AppState, RouterError, SharedState};
pub use server::{shutdown_signal, Server};
