use thiserror::Error;

/// Every failure the attendance core reports to a caller.
///
/// The first group are client-side validation failures: they abort the
/// operation before anything touches the store. `Storage` and `Network` carry
/// the text produced by the server or the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttendanceError {
    #[error("Please enter a student name")]
    EmptyName,

    #[error("Student already exists: {0}")]
    DuplicateStudent(String),

    #[error("No attendance records to save")]
    EmptyRoster,

    #[error("Student not found: {0}")]
    UnknownStudent(String),

    #[error("Period must be between 1 and 7, got {0}")]
    InvalidPeriod(u8),

    #[error("Another load or save is still in flight")]
    Busy,

    #[error("{0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl AttendanceError {
    /// Stable machine-readable code used in sidecar error objects.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::EmptyName => "empty_name",
            AttendanceError::DuplicateStudent(_) => "duplicate_student",
            AttendanceError::EmptyRoster => "empty_roster",
            AttendanceError::UnknownStudent(_) => "unknown_student",
            AttendanceError::InvalidPeriod(_) => "invalid_period",
            AttendanceError::Busy => "busy",
            AttendanceError::Storage(_) => "storage_error",
            AttendanceError::Network(_) => "network_error",
            AttendanceError::MalformedPayload(_) => "bad_params",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AttendanceError::EmptyName
                | AttendanceError::DuplicateStudent(_)
                | AttendanceError::EmptyRoster
                | AttendanceError::UnknownStudent(_)
                | AttendanceError::InvalidPeriod(_)
        )
    }
}
