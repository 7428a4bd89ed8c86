// Destination URL normalization and slug validation
// Affiliate destinations are stored loosely by editors, so they are cleaned up right before navigation

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use url::Url;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UrlValidationError {
    #[error("Destination URL is empty")]
    Empty,

    #[error("Destination URL is malformed: {0}")]
    Malformed(String),
}

// =============================================================================
// SLUGS
// =============================================================================

/// Maximum slug length accepted on the public route and the admin API
pub const MAX_SLUG_LENGTH: usize = 120;

lazy_static! {
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]*$").unwrap();
}

/// Check whether a path segment can address a link or an article
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.len() <= MAX_SLUG_LENGTH && SLUG_REGEX.is_match(slug)
}

// =============================================================================
// DESTINATIONS
// =============================================================================

/// Normalize an affiliate destination before navigation.
///
/// - surrounding whitespace is trimmed, an empty result is rejected
/// - `http://` and `https://` URLs (any case) are returned unchanged
/// - protocol-relative `//host/path` becomes `https://host/path`
/// - anything else gets `https://` prepended
///
/// The result must parse as an absolute URL with a host.
pub fn normalize_destination(raw: &str) -> Result<String, UrlValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    let candidate = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| UrlValidationError::Malformed(format!("{} ({})", trimmed, e)))?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(candidate),
        _ => Err(UrlValidationError::Malformed(format!(
            "{} (missing host)",
            trimmed
        ))),
    }
}

fn has_http_scheme(url: &str) -> bool {
    let starts_with = |prefix: &str| {
        url.get(..prefix.len())
            .map(|head| head.eq_ignore_ascii_case(prefix))
            .unwrap_or(false)
    };

    starts_with("http://") || starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_gets_https() {
        assert_eq!(
            normalize_destination("example.com/x").unwrap(),
            "https://example.com/x"
        );
        assert_eq!(
            normalize_destination("shop.example.com/x").unwrap(),
            "https://shop.example.com/x"
        );
    }

    #[test]
    fn test_existing_scheme_is_unchanged() {
        assert_eq!(
            normalize_destination("https://shop.example.com/y").unwrap(),
            "https://shop.example.com/y"
        );
        assert_eq!(
            normalize_destination("http://example.com").unwrap(),
            "http://example.com"
        );
        assert_eq!(
            normalize_destination("HTTPS://Example.com/Path?q=1").unwrap(),
            "HTTPS://Example.com/Path?q=1"
        );
    }

    #[test]
    fn test_protocol_relative() {
        assert_eq!(
            normalize_destination("//cdn.example.com/a").unwrap(),
            "https://cdn.example.com/a"
        );
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(
            normalize_destination("  example.com  ").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_empty_destinations_rejected() {
        assert_eq!(normalize_destination(""), Err(UrlValidationError::Empty));
        assert_eq!(normalize_destination("   \t"), Err(UrlValidationError::Empty));
    }

    #[test]
    fn test_garbage_destinations_rejected() {
        assert!(matches!(
            normalize_destination("https://"),
            Err(UrlValidationError::Malformed(_))
        ));
        assert!(matches!(
            normalize_destination("javascript:alert(1)"),
            Err(UrlValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("promo-x"));
        assert!(is_valid_slug("best_water_bottle_2024"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("-leading-dash"));
        assert!(!is_valid_slug("has space"));
        assert!(!is_valid_slug("../etc"));
        assert!(!is_valid_slug(&"a".repeat(MAX_SLUG_LENGTH + 1)));
    }
}
