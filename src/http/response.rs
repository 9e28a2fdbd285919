//! Outcome of one completed transfer.

use serde::de::DeserializeOwned;

/// Result of a transfer, delivered to the request callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// Transfer completed with a 2xx status before the timeout.
    pub success: bool,
    /// Human-readable failure description. Empty on success.
    pub error: String,
    /// Response body. Empty on failure.
    pub payload: Vec<u8>,
    /// Wall-clock duration of the transfer attempt.
    pub elapsed_secs: f64,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
}

impl Response {
    pub fn succeeded(status: u16, payload: Vec<u8>, elapsed_secs: f64) -> Self {
        Self {
            success: true,
            error: String::new(),
            payload,
            elapsed_secs,
            status: Some(status),
        }
    }

    pub fn failed(error: String, status: Option<u16>, elapsed_secs: f64) -> Self {
        Self {
            success: false,
            error,
            payload: Vec::new(),
            elapsed_secs,
            status,
        }
    }

    /// Payload as UTF-8 text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Decode the payload as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Voice {
        name: String,
        rate: u32,
    }

    #[test]
    fn test_json_payload() {
        let response = Response::succeeded(200, br#"{"name":"allison","rate":22050}"#.to_vec(), 0.1);
        let voice: Voice = response.json().unwrap();
        assert_eq!(
            voice,
            Voice {
                name: "allison".into(),
                rate: 22050
            }
        );
    }

    #[test]
    fn test_failed_has_no_payload() {
        let response = Response::failed("boom".into(), Some(500), 0.5);
        assert!(!response.success);
        assert!(response.payload.is_empty());
        assert_eq!(response.text(), "");
        assert!(response.json::<Voice>().is_err());
    }
}
