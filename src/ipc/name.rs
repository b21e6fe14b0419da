//! Channel name derivation.
//!
//! The companion listens on a name derived from its own absolute path, so
//! both sides can find each other without any other rendezvous. Path
//! separators and `%` are percent-escaped, which keeps the mapping injective
//! and the name usable as a single socket or pipe name component. Only the
//! trailing [`MAX_CHANNEL_NAME_LEN`] bytes are kept.

use std::path::Path;

/// Longest channel name handed to the transport.
#[cfg(windows)]
pub const MAX_CHANNEL_NAME_LEN: usize = 246;

/// Longest channel name handed to the transport.
#[cfg(not(windows))]
pub const MAX_CHANNEL_NAME_LEN: usize = 96;

/// Derive the channel name for the companion at `path`.
///
/// Windows paths are case-insensitive and are lowercased first.
#[must_use]
pub fn channel_name(path: &Path) -> String {
    let full = path.to_string_lossy();
    let full = if cfg!(windows) {
        full.to_lowercase()
    } else {
        full.into_owned()
    };

    let mut escaped = String::with_capacity(full.len());
    for ch in full.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            '/' => escaped.push_str("%2F"),
            '\\' => escaped.push_str("%5C"),
            other => escaped.push(other),
        }
    }

    retain_suffix(&escaped, MAX_CHANNEL_NAME_LEN).to_owned()
}

/// Last `max` bytes of `s`, moved forward to the next char boundary.
fn retain_suffix(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }

    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
