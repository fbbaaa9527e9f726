use thiserror::Error;

/// Main error type for typegraph
#[derive(Error, Debug)]
pub enum TypegraphError {
    /// JSON decoding errors (introspection payloads, FK row files)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport errors from the introspection client
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A named kind (OBJECT, SCALAR, ...) whose type reference carries no name
    #[error("Malformed type reference: {0}")]
    MalformedTypeRef(String),

    /// A newer build generation started before this one could publish
    #[error("Build superseded (generation {generation})")]
    Superseded { generation: u64 },
}

/// Convenient Result type using TypegraphError
pub type Result<T> = std::result::Result<T, TypegraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TypegraphError::Fetch("Network error: refused".to_string());
        assert!(err.to_string().contains("Fetch error"));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_superseded_display_carries_generation() {
        let err = TypegraphError::Superseded { generation: 7 };
        assert_eq!(err.to_string(), "Build superseded (generation 7)");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: TypegraphError = json_err.into();
        assert!(matches!(err, TypegraphError::Json(_)));
    }

    #[test]
    fn test_malformed_type_ref_display() {
        let err = TypegraphError::MalformedTypeRef("OBJECT without name".to_string());
        assert_eq!(err.to_string(), "Malformed type reference: OBJECT without name");
    }
}
