//! Query string construction.
//!
//! Parameters are emitted in insertion order as `key=value` pairs joined by
//! `&`. Text values are percent-escaped, byte values are base64 encoded and
//! anything else is inserted verbatim after a warning.

use base64::{engine::general_purpose::STANDARD, Engine};

/// A query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Percent-escaped text.
    Text(String),
    /// Base64 encoded bytes.
    Bytes(Vec<u8>),
    /// Any other value, already stringified. Inserted unescaped.
    Other(String),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<Vec<u8>> for QueryValue {
    fn from(value: Vec<u8>) -> Self {
        QueryValue::Bytes(value)
    }
}

impl From<&[u8]> for QueryValue {
    fn from(value: &[u8]) -> Self {
        QueryValue::Bytes(value.to_vec())
    }
}

macro_rules! other_from {
    ($($t:ty),*) => {
        $(impl From<$t> for QueryValue {
            fn from(value: $t) -> Self {
                QueryValue::Other(value.to_string())
            }
        })*
    };
}

other_from!(bool, i32, i64, u32, u64, usize, f32, f64);

impl QueryValue {
    /// Encode the value for use in a query string.
    pub fn encode(&self, key: &str) -> String {
        match self {
            QueryValue::Text(s) => urlencoding::encode(s).into_owned(),
            QueryValue::Bytes(b) => STANDARD.encode(b),
            QueryValue::Other(s) => {
                tracing::warn!(
                    key = %key,
                    value = %s,
                    "Unsupported query parameter type, using value as-is"
                );
                s.clone()
            }
        }
    }
}

/// Build the query string (without the leading `?`).
pub fn build_query(parameters: &[(String, QueryValue)]) -> String {
    parameters
        .iter()
        .map(|(key, value)| format!("{}={}", key, value.encode(key)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Join a base URL, function suffix and query parameters into a full URL.
pub fn build_url(base_url: &str, function: &str, parameters: &[(String, QueryValue)]) -> String {
    let mut url = format!("{}{}", base_url, function);
    if !parameters.is_empty() {
        url.push('?');
        url.push_str(&build_query(parameters));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_bytes() {
        let params = vec![
            ("q".to_string(), QueryValue::from("a b")),
            ("blob".to_string(), QueryValue::from(vec![1u8, 2, 3])),
        ];
        assert_eq!(build_query(&params), "q=a%20b&blob=AQID");
    }

    #[test]
    fn test_insertion_order_preserved() {
        let params = vec![
            ("z".to_string(), QueryValue::from("1")),
            ("a".to_string(), QueryValue::from("2")),
            ("m".to_string(), QueryValue::from("3")),
        ];
        assert_eq!(build_query(&params), "z=1&a=2&m=3");
    }

    #[test]
    fn test_other_values_are_verbatim() {
        let params = vec![
            ("limit".to_string(), QueryValue::from(10u32)),
            ("exact".to_string(), QueryValue::from(true)),
        ];
        assert_eq!(build_query(&params), "limit=10&exact=true");
    }

    #[test]
    fn test_reserved_characters_escaped() {
        let params = vec![("text".to_string(), QueryValue::from("a&b=c/d?"))];
        assert_eq!(build_query(&params), "text=a%26b%3Dc%2Fd%3F");
    }

    #[test]
    fn test_build_url() {
        assert_eq!(build_url("https://svc/", "", &[]), "https://svc/");
        assert_eq!(
            build_url("https://svc/v1", "/items", &[("id".into(), QueryValue::from("7"))]),
            "https://svc/v1/items?id=7"
        );
    }
}
