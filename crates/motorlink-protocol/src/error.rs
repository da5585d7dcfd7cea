//! Protocol error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Malformed payload: expected 1..={width} bytes, got {actual}")]
    MalformedPayload { width: usize, actual: usize },

    #[error("Invalid channel '{channel}': {reason}")]
    InvalidChannel { channel: String, reason: String },

    #[error("Invalid profile '{profile}': {reason}")]
    InvalidProfile { profile: String, reason: String },

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Profile parse error: {0}")]
    ProfileParse(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

impl From<serde_yaml::Error> for ProtocolError {
    fn from(e: serde_yaml::Error) -> Self {
        ProtocolError::ProfileParse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::MalformedPayload {
            width: 2,
            actual: 0,
        };
        assert_eq!(
            err.to_string(),
            "Malformed payload: expected 1..=2 bytes, got 0"
        );

        let err = ProtocolError::UnknownProfile("gamepad".to_string());
        assert_eq!(err.to_string(), "Unknown profile: gamepad");
    }

    #[test]
    fn test_error_from_yaml() {
        let yaml_err = serde_yaml::from_str::<u8>("[not, a, byte]")
            .err()
            .expect("sequence must not parse as u8");
        let err: ProtocolError = yaml_err.into();
        assert!(matches!(err, ProtocolError::ProfileParse(_)));
    }
}
