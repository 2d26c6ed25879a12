/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Joins `path` onto `base` unless `path` is already an absolute http(s) URL. Returns `None` if the result would not
/// be absolute, e.g. when `base` is itself relative.
pub fn absolute_url(base: &str, path: &str) -> Option<String> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    if path.starts_with("https://") || path.starts_with("http://") {
        return Some(path.to_string());
    }
    let base = base.trim().trim_end_matches('/');
    if !(base.starts_with("https://") || base.starts_with("http://")) {
        return None;
    }
    Some(format!("{base}/{}", path.trim_start_matches('/')))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("Yes".into()), false));
        assert!(!parse_boolean_flag(Some("0".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
    }

    #[test]
    fn absolute_urls() {
        assert_eq!(absolute_url("https://shop.test/", "/img/a.png"), Some("https://shop.test/img/a.png".into()));
        assert_eq!(absolute_url("https://shop.test", "img/a.png"), Some("https://shop.test/img/a.png".into()));
        assert_eq!(absolute_url("", "https://cdn.test/a.png"), Some("https://cdn.test/a.png".into()));
        assert_eq!(absolute_url("/relative", "a.png"), None);
        assert_eq!(absolute_url("https://shop.test", "  "), None);
    }
}
