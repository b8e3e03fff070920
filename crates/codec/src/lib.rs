//! imgdepot Codec Layer
//!
//! Images travel to the server as base64 text. Full data URIs are noisy
//! (`data:image/png;base64,` prefix, `+` and `/` that need escaping in URLs,
//! trailing `=` padding), so clients send a *compact token* instead and we
//! rebuild the data URI on arrival.
//!
//! ## What lives here
//!
//! - [`compress`] strips a well-formed `data:` prefix and converts the payload
//!   to URL-safe form without padding. Malformed prefixes compress to `""`.
//! - [`rebuild`] reverses the substitutions, recomputes padding from the token
//!   length and prepends `data:<mime>;base64,`.
//! - [`split_data_uri`] picks a data URI apart without copying.
//! - [`mime`] maps file extensions to content types and recognises the common
//!   image signatures at the head of a token.
//!
//! ## Round trip
//!
//! ```
//! use codec::{compress, rebuild};
//!
//! let uri = "data:image/gif;base64,R0lGODlhAQABAIAAAP///wAAACH5BAEAAAAALAAAAAABAAEAAAICRAEAOw==";
//! let token = compress(uri);
//! assert!(!token.contains('/'));
//! assert!(!token.ends_with('='));
//! assert_eq!(rebuild(&token, "image/gif"), uri);
//! ```

mod compact;
pub mod mime;

pub use crate::compact::{
    compress, rebuild, rebuild_default, rebuild_value, split_data_uri, DataUri, DEFAULT_MIME,
};
pub use crate::mime::{content_type_for_path, sniff_image_mime};
