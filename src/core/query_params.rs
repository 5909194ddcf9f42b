use std::collections::HashMap;

/// Split a request URI into its path and query parts.
///
/// Accepts both origin-form (`/api/post?page=2`) and absolute-form
/// (`http://host/api/post?page=2`) URIs, since Spin hands components the
/// latter and the native adapter the former.
pub fn split_uri(uri: &str) -> (&str, &str) {
    let without_authority = match uri.find("://") {
        Some(scheme_end) => {
            let rest = &uri[scheme_end + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
        }
        None => uri,
    };
    let without_fragment = without_authority
        .split_once('#')
        .map(|(before, _)| before)
        .unwrap_or(without_authority);
    match without_fragment.split_once('?') {
        Some((path, query)) => (path, query),
        None => (without_fragment, ""),
    }
}

/// Parse query parameters from a URI string.
///
/// Values are URL-decoded. Repeated keys keep the last value.
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let (_, query) = split_uri(uri);
    let mut params = HashMap::new();

    for param in query.split('&').filter(|p| !p.is_empty()) {
        let (key, encoded_value) = param.split_once('=').unwrap_or((param, ""));
        let decoded = urlencoding::decode(&encoded_value.replace('+', " "))
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| encoded_value.to_string());
        params.insert(key.to_string(), decoded);
    }

    params
}

/// Get a positive integer parameter, falling back to `default` when absent or malformed.
pub fn get_u32(params: &HashMap<String, String>, key: &str, default: u32) -> u32 {
    params
        .get(key)
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(default)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_origin_and_absolute_forms() {
        assert_eq!(split_uri("/api/post/posts?page=2"), ("/api/post/posts", "page=2"));
        assert_eq!(
            split_uri("http://localhost:3000/api/Image?page=1&pageSize=12"),
            ("/api/Image", "page=1&pageSize=12")
        );
        assert_eq!(split_uri("http://localhost:3000"), ("/", ""));
    }

    #[test]
    fn decodes_values() {
        let params = parse_query_params("/x?user=john%20doe&page=2&flag");
        assert_eq!(params.get("user").map(String::as_str), Some("john doe"));
        assert_eq!(get_u32(&params, "page", 1), 2);
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let params = parse_query_params("/x?page=abc&pageSize=0");
        assert_eq!(get_u32(&params, "page", 1), 1);
        assert_eq!(get_u32(&params, "pageSize", 10), 1);
        assert_eq!(get_u32(&params, "missing", 12), 12);
    }
}
