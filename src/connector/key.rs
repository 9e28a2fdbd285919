//! Registry cache key.

use std::fmt;

/// Identifies a connector: a service plus the function suffix it serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectorKey {
    service_id: String,
    function: String,
}

impl ConnectorKey {
    pub fn new(service_id: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            function: function.into(),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn function(&self) -> &str {
        &self.function
    }
}

impl fmt::Display for ConnectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.service_id, self.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_identity() {
        let mut keys = HashSet::new();
        keys.insert(ConnectorKey::new("svcA", "/x"));
        assert!(keys.contains(&ConnectorKey::new("svcA", "/x")));
        assert!(!keys.contains(&ConnectorKey::new("svcA", "/y")));
        // Concatenation collisions stay distinct.
        assert_ne!(ConnectorKey::new("ab", "/c"), ConnectorKey::new("a", "b/c"));
        assert_eq!(ConnectorKey::new("svcA", "/x").to_string(), "svcA/x");
    }
}
