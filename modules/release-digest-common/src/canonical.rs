use url::Url;

use crate::error::MalformedItem;

/// Canonicalize a release link into its identity key.
///
/// - Resolves relative hrefs against `base` (discover pages link with
///   host-relative paths)
/// - Only http/https survive
/// - Drops fragment and the whole query string; platform links carry
///   tracking parameters such as `?from=discover_page`
/// - Removes default ports, lower-cases the host
/// - Removes the trailing slash unless the path is just "/"
pub fn canonical_url(raw: &str, base: Option<&Url>) -> Result<String, MalformedItem> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MalformedItem::MissingUrl);
    }

    let invalid = |reason: String| MalformedItem::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let mut parsed = match Url::parse(raw) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(b) => b.join(raw).map_err(|e| invalid(e.to_string()))?,
            None => return Err(invalid("relative url without a base".to_string())),
        },
        Err(e) => return Err(invalid(e.to_string())),
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    parsed.set_fragment(None);
    parsed.set_query(None);

    // Url already lower-cases the host and strips the scheme's default port.
    let mut result = parsed.to_string();
    if result.ends_with('/') && parsed.path() != "/" {
        result.pop();
    }

    Ok(result)
}
