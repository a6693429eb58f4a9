//! `X-XSS-Protection` header parsing.
//!
//! The accepted grammar follows the behaviour established by WebKit's XSS
//! auditor, which other engines copied:
//!
//! 1. a missing or empty value leaves the filter enabled
//! 2. a value starting with `0` disables the filter
//! 3. exactly `1 ; mode = block` (any tab/space runs, tokens
//!    case-insensitive, nothing after `block`) enables block mode
//! 4. anything else leaves the filter enabled without block mode
//!
//! Malformed values never produce an error; they fail open.

/// Where a policy value came from. This only changes what counts as
/// whitespace between tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HeaderSource {
    /// An HTTP response header. Only tab and space are skipped.
    #[default]
    Http,
    /// A `<meta http-equiv>` content attribute. Every byte up to and
    /// including 0x20 is skipped.
    HttpEquivMeta,
}

/// The per-page policy announced by the site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderPolicy {
    /// Whether the filter runs for this page.
    pub enabled: bool,
    /// Whether violations cancel the load.
    pub block_mode: bool,
}

impl HeaderPolicy {
    /// Policy for a missing or unrecognised header.
    pub const DEFAULT: HeaderPolicy = HeaderPolicy {
        enabled: true,
        block_mode: false,
    };

    /// Policy for an explicit `0`.
    pub const DISABLED: HeaderPolicy = HeaderPolicy {
        enabled: false,
        block_mode: false,
    };

    /// Policy for `1; mode=block`.
    pub const BLOCK: HeaderPolicy = HeaderPolicy {
        enabled: true,
        block_mode: true,
    };

    /// Parse an HTTP header value.
    pub fn parse(value: Option<&str>) -> Self {
        Self::parse_with(value, HeaderSource::Http)
    }

    /// Parse a value from the given source.
    pub fn parse_with(value: Option<&str>, source: HeaderSource) -> Self {
        let mut bytes = value.unwrap_or("").as_bytes();

        // Header values arrive trimmed; meta content attributes do not.
        if source == HeaderSource::HttpEquivMeta {
            let start = bytes.iter().position(|&b| b > b' ').unwrap_or(bytes.len());
            bytes = &bytes[start..];
        }

        match bytes.first() {
            None => HeaderPolicy::DEFAULT,
            Some(b'0') => HeaderPolicy::DISABLED,
            Some(_) if matches_block_mode(bytes, source) => HeaderPolicy::BLOCK,
            Some(_) => HeaderPolicy::DEFAULT,
        }
    }
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        HeaderPolicy::DEFAULT
    }
}

/// Single left-to-right scan for `1[ws]*;[ws]*mode[ws]*=[ws]*block`.
/// The first mismatch abandons the match.
fn matches_block_mode(s: &[u8], source: HeaderSource) -> bool {
    let mut pos = 0;

    expect_byte(s, &mut pos, b'1')
        && skip_whitespace(s, &mut pos, source)
        && expect_byte(s, &mut pos, b';')
        && skip_whitespace(s, &mut pos, source)
        && skip_token(s, &mut pos, b"mode")
        && skip_whitespace(s, &mut pos, source)
        && expect_byte(s, &mut pos, b'=')
        && skip_whitespace(s, &mut pos, source)
        && skip_token(s, &mut pos, b"block")
        && pos == s.len()
}

fn expect_byte(s: &[u8], pos: &mut usize, expected: u8) -> bool {
    match s.get(*pos) {
        Some(&b) if b == expected => {
            *pos += 1;
            true
        }
        _ => false,
    }
}

/// Returns true if there is more input after the whitespace.
fn skip_whitespace(s: &[u8], pos: &mut usize, source: HeaderSource) -> bool {
    let is_space = |b: u8| match source {
        HeaderSource::Http => b == b'\t' || b == b' ',
        HeaderSource::HttpEquivMeta => b <= b' ',
    };

    while *pos < s.len() && is_space(s[*pos]) {
        *pos += 1;
    }
    *pos < s.len()
}

/// Matches `token` (lowercase) case-insensitively. A token cut short by the
/// end of input does not match.
fn skip_token(s: &[u8], pos: &mut usize, token: &[u8]) -> bool {
    for &expected in token {
        match s.get(*pos) {
            Some(&b) if b.to_ascii_lowercase() == expected => *pos += 1,
            _ => return false,
        }
    }
    true
}
