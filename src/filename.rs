use crate::Error;
use sanitize_filename::{Options, sanitize_with_options};
use std::fmt;

/// Longest client name kept, in bytes, leaving room for the timestamp
/// prefix under the usual 255-byte file name limit.
const MAX_ORIGINAL_LEN: usize = 200;

/// Windows rules apply on every platform so stored names stay portable.
fn options() -> Options<'static> {
    Options {
        windows: true,
        truncate: true,
        replacement: "",
    }
}

/// A client-supplied file name made safe to embed in a stored name: only
/// the last path component survives (`/` and `\` both separate), then
/// characters that are illegal or reserved on common filesystems are
/// stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalName(String);

impl OriginalName {
    pub fn parse(name: &str) -> Result<Self, Error> {
        let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
        let mut end = base.len().min(MAX_ORIGINAL_LEN);
        while !base.is_char_boundary(end) {
            end -= 1;
        }
        let clean = sanitize_with_options(&base[..end], options());
        if clean.is_empty() {
            return Err(Error::InvalidName);
        }
        Ok(Self(clean))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginalName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds `<epoch-ms>-<original>`.
pub fn stored_name(timestamp_ms: i64, original: &OriginalName) -> String {
    format!("{timestamp_ms}-{original}")
}

/// Checks a name taken from a request path before it touches the disk.
/// Anything the sanitizer would alter cannot have been generated here, and
/// hidden names are refused as well.
pub fn validate_stored(name: &str) -> Result<&str, Error> {
    if name.is_empty() || name.starts_with('.') || sanitize_with_options(name, options()) != name {
        return Err(Error::InvalidName);
    }
    Ok(name)
}
