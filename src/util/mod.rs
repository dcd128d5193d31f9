/// Syntactic check for an absolute http(s) URL with a non-empty host.
///
/// Kept deliberately permissive past scheme + host; the backend stores the
/// string as-is and the browser resolves it when the user opens the link.
pub(crate) fn is_valid_http_url(raw: &str) -> bool {
    let raw = raw.trim();

    let rest = if let Some(r) = raw.strip_prefix("https://") {
        r
    } else if let Some(r) = raw.strip_prefix("http://") {
        r
    } else {
        return false;
    };

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return false;
    }

    // A URL never contains whitespace; anything else is the backend's problem.
    !raw.chars().any(char::is_whitespace)
}

/// Validates the add-bookmark form. Returns the trimmed (url, title) pair so
/// the caller inserts exactly what was validated.
pub(crate) fn validate_new_bookmark(url: &str, title: &str) -> Result<(String, String), String> {
    let url = url.trim();
    let title = title.trim();

    if url.is_empty() || title.is_empty() {
        return Err("Both URL and title are required".to_string());
    }

    if !is_valid_http_url(url) {
        return Err("URL must start with http:// or https://".to_string());
    }

    Ok((url.to_string(), title.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_http_urls() {
        assert!(is_valid_http_url("https://example.com"));
        assert!(is_valid_http_url("http://example.com/path?q=1#frag"));
        assert!(is_valid_http_url("  https://example.com  "));
    }

    #[test]
    fn test_invalid_urls() {
        assert!(!is_valid_http_url("not a url"));
        assert!(!is_valid_http_url("ftp://example.com"));
        assert!(!is_valid_http_url("https://"));
        assert!(!is_valid_http_url("example.com"));
        assert!(!is_valid_http_url("https://exa mple.com"));
        assert!(!is_valid_http_url(""));
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        assert!(validate_new_bookmark("", "x").is_err());
        assert!(validate_new_bookmark("https://example.com", "").is_err());
        assert!(validate_new_bookmark("   ", "   ").is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_url() {
        let err = validate_new_bookmark("not a url", "x").unwrap_err();
        assert!(err.contains("http"));
    }

    #[test]
    fn test_validate_trims_accepted_input() {
        let (url, title) = validate_new_bookmark(" https://example.com ", " Example ")
            .expect("valid submission should pass");
        assert_eq!(url, "https://example.com");
        assert_eq!(title, "Example");
    }
}
