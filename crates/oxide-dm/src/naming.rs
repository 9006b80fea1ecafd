//! Index and constraint naming under the DM identifier limit.

use std::sync::LazyLock;

use regex::Regex;
use sha1::{Digest, Sha1};

/// Longest identifier the engine accepts, in characters.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Characters kept from the first field when a name has to be hashed.
///
/// A SHA-1 digest is 40 hex characters, so the result is at most 128.
pub const HASHED_PREFIX_LEN: usize = 88;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z0-9]+").expect("static regex is valid"));

fn sanitize(name: &str) -> String {
    NON_ALPHANUMERIC.replace_all(name, "_").into_owned()
}

/// Builds an index or constraint name such as `idx_users_email`.
///
/// Names longer than [`MAX_IDENTIFIER_LEN`] are replaced by a prefix of the
/// first field followed by the hex SHA-1 of the full name.
#[must_use]
pub fn build_key_name(kind: &str, table: &str, fields: &[&str]) -> String {
    let key_name = sanitize(&format!("{kind}_{table}_{}", fields.join("_")));
    if key_name.chars().count() <= MAX_IDENTIFIER_LEN {
        return key_name;
    }

    let digest = hex::encode(Sha1::digest(key_name.as_bytes()));
    let prefix: String = fields
        .first()
        .map(|f| sanitize(f).chars().take(HASHED_PREFIX_LEN).collect())
        .unwrap_or_default();

    format!("{prefix}{digest}")
}
