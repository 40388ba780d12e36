//! # Burrow Protocol Library
//!
//! Wire types shared by the Burrow daemon and its HTTP clients.
//!
//! ## Overview
//!
//! The daemon serves a single storage root over plain HTTP. The request path
//! addresses a file or directory below that root and the verb selects the
//! operation:
//!
//! ```text
//! PUT    /{*path}   upload (create or truncate)
//! GET    /{*path}   download a file, or list a directory as JSON
//! HEAD   /{*path}   size and last-modified time of a file
//! DELETE /{*path}   remove a file, or a directory recursively
//! ```
//!
//! Directory listings are JSON arrays of [`ListingEntry`] values ordered
//! files first, then directories, each group sorted by name.
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{parse_listing, EntryKind};
//!
//! let body = br#"[{"Name":"a.txt","Type":"File"},{"Name":"docs","Type":"Directory"}]"#;
//! let entries = parse_listing(body).unwrap();
//! assert_eq!(entries[1].kind, EntryKind::Directory);
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: Listing entries, header values, and content types
//! - [`error`]: Error types

pub mod error;
pub mod messages;

pub use error::{ProtocolError, Result};
pub use messages::{
    content_disposition, disposition_file_name, parse_listing, sort_listing, EntryKind,
    ListingEntry, ALLOWED_METHODS, OCTET_STREAM,
};
