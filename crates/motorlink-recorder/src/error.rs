use thiserror::Error;

/// A batch could not be persisted. The batch stays buffered.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Reading fields [{found}] do not match the header [{expected}]")]
    SchemaMismatch { expected: String, found: String },

    #[error("Sink rejected the batch: {0}")]
    Rejected(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_display() {
        let err = PersistenceError::SchemaMismatch {
            expected: "Current,Angle".to_string(),
            found: "Angle".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Reading fields [Angle] do not match the header [Current,Angle]"
        );
    }
}
