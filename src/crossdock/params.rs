//! Behavior parameters extracted from the request query.

use std::collections::BTreeMap;

/// Query parameter that selects the behavior to run.
pub const BEHAVIOR_PARAM: &str = "behavior";

/// Flat key/value view of the behavior parameters.
pub type Params = BTreeMap<String, String>;

/// Flatten a raw query string into [`Params`].
///
/// Keys that appear more than once keep their last value.
pub fn extract_params(query: Option<&str>) -> Params {
    let mut params = Params::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.insert(key.into_owned(), value.into_owned());
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_value_wins() {
        let params = extract_params(Some("sampled=false&behavior=trace&sampled=true"));
        assert_eq!(params.len(), 2);
        assert_eq!(params["sampled"], "true");
        assert_eq!(params["behavior"], "trace");
    }

    #[test]
    fn test_empty_and_missing_query() {
        assert!(extract_params(None).is_empty());
        assert!(extract_params(Some("")).is_empty());
    }

    #[test]
    fn test_percent_decoding() {
        let params = extract_params(Some("s1name=my%20service&s2name=a+b"));
        assert_eq!(params["s1name"], "my service");
        assert_eq!(params["s2name"], "a b");
    }

    #[test]
    fn test_key_without_value() {
        let params = extract_params(Some("behavior"));
        assert_eq!(params["behavior"], "");
    }
}
