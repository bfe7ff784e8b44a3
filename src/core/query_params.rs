use std::collections::HashMap;

/// Parse query parameters from a URI string.
///
/// Handles URL decoding; when a key repeats only the last value is kept.
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&') {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = &param[eq_idx + 1..];
                let decoded = urlencoding::decode(encoded_value)
                    .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                    .to_string();
                params.insert(key.to_string(), decoded);
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

/// Get a string parameter with an optional default.
pub fn get_string(params: &HashMap<String, String>, key: &str, default: Option<&str>) -> Option<String> {
    params.get(key)
        .cloned()
        .or_else(|| default.map(|d| d.to_string()))
}

/// Lenient 1-based page number: absent, non-numeric, or non-positive
/// values all fall back to page 1.
pub fn get_page(params: &HashMap<String, String>) -> usize {
    params.get("page")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_decodes_params() {
        let params = parse_query_params("/posts?user=alice%20b&page=2");
        assert_eq!(params.get("user"), Some(&"alice b".to_string()));
        assert_eq!(params.get("page"), Some(&"2".to_string()));
    }

    #[test]
    fn page_falls_back_to_one() {
        assert_eq!(get_page(&parse_query_params("/posts")), 1);
        assert_eq!(get_page(&parse_query_params("/posts?page=abc")), 1);
        assert_eq!(get_page(&parse_query_params("/posts?page=-3")), 1);
        assert_eq!(get_page(&parse_query_params("/posts?page=0")), 1);
        assert_eq!(get_page(&parse_query_params("/posts?page=7")), 7);
    }
}
