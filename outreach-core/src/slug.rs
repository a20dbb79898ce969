//! URL-friendly organization slugs.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::error::{Error, Result};

const SUFFIX_LEN: usize = 4;
const MAX_ATTEMPTS: usize = 5;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_-]+").unwrap());

/// Lowercased, hyphen-separated form of `name` with no random suffix.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let cleaned = DISALLOWED.replace_all(&lowered, "");
    let hyphenated = SEPARATORS.replace_all(&cleaned, "-");
    hyphenated.trim_matches('-').to_string()
}

/// `slugify(name)` plus a random 4-character base-36 suffix.
pub fn generate_slug(name: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    let base = slugify(name);
    if base.is_empty() {
        suffix
    } else {
        format!("{}-{}", base, suffix)
    }
}

/// Generate slugs until `exists` reports a free one, giving up after five tries.
pub fn unique_slug<F>(name: &str, mut exists: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    for _ in 0..MAX_ATTEMPTS {
        let candidate = generate_slug(name);
        if !exists(&candidate)? {
            return Ok(candidate);
        }
        tracing::debug!(%candidate, "Slug already taken, retrying");
    }
    Err(Error::Validation(format!(
        "Failed to generate unique slug for \"{}\" after {} attempts",
        name, MAX_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_punctuation_and_collapses_separators() {
        assert_eq!(slugify("  Acme Widgets, Inc. "), "acme-widgets-inc");
        assert_eq!(slugify("foo__bar -- baz"), "foo-bar-baz");
        assert_eq!(slugify("--edge--"), "edge");
    }

    #[test]
    fn generated_slug_has_base36_suffix() {
        let slug = generate_slug("Acme");
        let (base, suffix) = slug.rsplit_once('-').unwrap();
        assert_eq!(base, "acme");
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn unique_slug_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result = unique_slug("Acme", |_| {
            calls += 1;
            Ok(true)
        });
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(calls, MAX_ATTEMPTS);
    }

    #[test]
    fn unique_slug_returns_first_free_candidate() {
        let mut taken = 2;
        let slug = unique_slug("Acme", |_| {
            taken -= 1;
            Ok(taken >= 0)
        })
        .unwrap();
        assert!(slug.starts_with("acme-"));
    }
}
