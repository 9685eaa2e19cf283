//! Object key derivation for uploaded files.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

/// Length of the random suffix appended to every converted filename.
pub const SUFFIX_LENGTH: usize = 7;
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Whitespace, or any run of two or more dashes/whitespace.
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\s-]{2,}|\s").expect("separator pattern is valid")
});

/// Convert an uploaded filename into an object key.
///
/// The name is lower-cased, whitespace and repeated dashes collapse to a single
/// dash, and a random 7-character `[a-z0-9]` suffix is inserted before the
/// extension: `"My  Template.PDF"` becomes `"my-template-x3k9q0a.pdf"`. Any
/// directory part sent by the client is dropped.
pub fn convert_filename(filename: &str) -> String {
    let stem = normalize_filename(filename);
    let suffix = random_suffix();

    match split_extension(&stem) {
        Some((name, ext)) => format!("{name}-{suffix}.{ext}"),
        None => format!("{stem}-{suffix}"),
    }
}

/// The deterministic part of [`convert_filename`].
pub fn normalize_filename(filename: &str) -> String {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    SEPARATORS
        .replace_all(&basename.to_lowercase(), "-")
        .into_owned()
}

fn split_extension(name: &str) -> Option<(&str, &str)> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some((stem, ext)),
        _ => None,
    }
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LENGTH)
        .map(|_| char::from(SUFFIX_CHARSET[rng.random_range(0..SUFFIX_CHARSET.len())]))
        .collect()
}
