//! Wire definitions for Burrow's HTTP surface.
//!
//! Listings travel as JSON; everything else is raw bytes or plain text with
//! a handful of fixed header values defined here.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Content type used for every download.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Value of the `Allow` header sent with 405 responses.
pub const ALLOWED_METHODS: &str = "GET, HEAD, PUT, DELETE";

/// Kind of an entry in the storage tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Anything that is not a directory.
    File,
    /// Directory.
    Directory,
}

impl EntryKind {
    /// Sort rank: files list before directories.
    fn rank(self) -> u8 {
        match self {
            EntryKind::File => 0,
            EntryKind::Directory => 1,
        }
    }

    /// Human-readable noun used in confirmation messages.
    pub fn noun(self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "folder",
        }
    }
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Entry name (not full path).
    #[serde(rename = "Name")]
    pub name: String,
    /// Entry kind.
    #[serde(rename = "Type")]
    pub kind: EntryKind,
}

impl ListingEntry {
    /// Create a new listing entry.
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Total order used for listings: kind first, then byte-wise name.
    pub fn listing_order(&self, other: &Self) -> Ordering {
        self.kind
            .rank()
            .cmp(&other.kind.rank())
            .then_with(|| self.name.as_bytes().cmp(other.name.as_bytes()))
    }
}

/// Sort entries into listing order in place.
pub fn sort_listing(entries: &mut [ListingEntry]) {
    entries.sort_by(ListingEntry::listing_order);
}

/// Decode a listing response body.
pub fn parse_listing(body: &[u8]) -> Result<Vec<ListingEntry>> {
    Ok(serde_json::from_slice(body)?)
}

/// Build a `Content-Disposition` value suggesting `file_name` for download.
///
/// The quoted `filename` parameter is an ASCII fallback in which quotes,
/// backslashes, semicolons, control and non-ASCII characters are replaced
/// with `_`. When that changes the name, the exact name is also sent as a
/// percent-encoded UTF-8 `filename*` parameter (RFC 6266).
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && !matches!(c, '"' | '\\' | ';') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == file_name {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(file_name)
        )
    }
}

/// Recover the suggested file name from a `Content-Disposition` value.
///
/// The `filename*` parameter wins over the ASCII `filename` fallback.
pub fn disposition_file_name(value: &str) -> Option<String> {
    let mut fallback = None;

    for param in value.split(';').map(str::trim) {
        if let Some(encoded) = param.strip_prefix("filename*=UTF-8''") {
            if let Ok(name) = urlencoding::decode(encoded) {
                return Some(name.into_owned());
            }
        } else if let Some(quoted) = param.strip_prefix("filename=") {
            fallback = Some(quoted.trim_matches('"').to_string());
        }
    }

    fallback
}
