//! Error kinds raised by the shift operator and its function wrapper.
//!
//! Entry points return `anyhow::Result`; match on the kind with
//! `err.downcast_ref::<ShiftError>()`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShiftError {
    /// Bad construction or setup arguments, fatal to the operator instance.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The host called forward/backward without a matching setup.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Too few inputs/outputs handed to a function, or mismatched buffers.
    #[error("{function}: {message}")]
    Arity { function: String, message: String },
}

impl ShiftError {
    pub fn rank_mismatch(shifts: usize, rank: usize) -> Self {
        ShiftError::Configuration(format!(
            "shift vector has {shifts} entries but the input has rank {rank}"
        ))
    }

    pub fn unknown_border_mode(mode: &str) -> Self {
        ShiftError::Configuration(format!(
            "unrecognized border mode '{mode}', expected 'nearest' or 'reflect'"
        ))
    }

    pub fn not_setup(shape: &[usize]) -> Self {
        ShiftError::Precondition(format!(
            "no address table prepared for input shape {shape:?}, call setup first"
        ))
    }

    pub fn arity(function: impl Into<String>, message: impl Into<String>) -> Self {
        ShiftError::Arity {
            function: function.into(),
            message: message.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ShiftError::Configuration(_))
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, ShiftError::Precondition(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_mismatch_display() {
        let err = ShiftError::rank_mismatch(2, 3);
        let msg = format!("{}", err);
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("2 entries"));
        assert!(msg.contains("rank 3"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_not_setup_display() {
        let err = ShiftError::not_setup(&[1, 4]);
        let msg = format!("{}", err);
        assert!(msg.contains("[1, 4]"));
        assert!(err.is_precondition());
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = ShiftError::unknown_border_mode("wrap").into();
        let kind = err.downcast_ref::<ShiftError>().unwrap();
        assert!(kind.is_configuration());
        assert!(format!("{}", err).contains("'wrap'"));
    }
}
