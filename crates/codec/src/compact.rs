//! Compact token <-> data URI conversion.
//!
//! The substitution order is fixed (`+`/`-`, `/`/`_`) and padding is derived
//! from the token length alone. Nothing here looks at the decoded bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// MIME type used by [`rebuild_default`] when the caller knows nothing better.
pub const DEFAULT_MIME: &str = "image/jpeg";

const DATA_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// `data:<mime>(;<param>)*;base64,<payload>`, anchored at both ends.
static DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^data:([^;,]+)(?:;[^;,]+)*?;base64,(.*)$")
        .expect("data URI pattern is a valid regex")
});

/// Borrowed view of a well-formed base64 data URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUri<'a> {
    /// Media type, e.g. `image/png`. Never empty.
    pub mime: &'a str,
    /// Standard base64 payload, possibly padded, possibly empty.
    pub payload: &'a str,
}

/// Split `input` into MIME type and payload.
///
/// Returns `None` unless the whole string is a well-formed base64 data URI.
pub fn split_data_uri(input: &str) -> Option<DataUri<'_>> {
    let caps = DATA_URI.captures(input)?;
    let mime = caps.get(1)?.as_str();
    let payload = caps.get(2)?.as_str();
    Some(DataUri { mime, payload })
}

/// Turn a data URI (or an already raw payload) into a compact URL-safe token.
///
/// A string that starts with `data:` but is not a well-formed base64 data URI
/// yields an empty token. Anything else is treated as a raw payload and only
/// goes through the character substitutions.
pub fn compress(input: &str) -> String {
    let payload = if input.starts_with(DATA_SCHEME) {
        match split_data_uri(input) {
            Some(uri) => uri.payload,
            None => return String::new(),
        }
    } else {
        input
    };

    let mut token: String = payload
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let unpadded = token.trim_end_matches('=').len();
    token.truncate(unpadded);
    token
}

/// Rebuild a full data URI from a compact token.
///
/// Padding is `(4 - len % 4) % 4` equals signs, so an empty token rebuilds to
/// a bare `data:<mime>;base64,` prefix.
pub fn rebuild(token: &str, mime: &str) -> String {
    let padding = (4 - token.len() % 4) % 4;
    let mut uri = String::with_capacity(
        DATA_SCHEME.len() + mime.len() + BASE64_MARKER.len() + token.len() + padding,
    );
    uri.push_str(DATA_SCHEME);
    uri.push_str(mime);
    uri.push_str(BASE64_MARKER);
    uri.extend(token.chars().map(|c| match c {
        '-' => '+',
        '_' => '/',
        other => other,
    }));
    uri.extend(std::iter::repeat('=').take(padding));
    uri
}

/// [`rebuild`] with [`DEFAULT_MIME`].
pub fn rebuild_default(token: &str) -> String {
    rebuild(token, DEFAULT_MIME)
}

/// [`rebuild`] for untyped JSON input. Non-string values count as an empty token.
pub fn rebuild_value(token: &Value, mime: &str) -> String {
    rebuild(token.as_str().unwrap_or_default(), mime)
}
