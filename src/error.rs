use std::time::Duration;
use thiserror::Error;

/// Broad failure classes. Only `Budget` can be avoided by configuration; the rest abort the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Auth, quota or network failure reported by a Google API.
    ExternalService,
    /// Data that breaks an assumption the audit relies on.
    MalformedData,
    /// The call budget ran out and the policy says fail instead of wait.
    Budget,
    /// The service-account key could not be loaded.
    Credentials,
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Drive API error: {0}")]
    Drive(google_drive3::Error),

    #[error("Sheets API error: {0}")]
    Sheets(google_sheets4::Error),

    #[error("file {file_id} has no owners")]
    MissingOwner { file_id: String },

    #[error("{context} is missing field `{field}`")]
    MissingField {
        field: &'static str,
        context: String,
    },

    #[error("snapshot is missing required column `{column}`")]
    MissingColumn { column: &'static str },

    #[error("spreadsheet has no sheets")]
    NoSheet,

    #[error("call budget of {max_calls} calls per {window:?} exhausted")]
    BudgetExhausted { max_calls: usize, window: Duration },

    #[error("failed to load service account credentials: {0}")]
    Credentials(#[source] std::io::Error),

    #[error("service account key is not valid base64: {0}")]
    CredentialEncoding(#[from] base64::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Drive(_) | Self::Sheets(_) => ErrorCategory::ExternalService,
            Self::MissingOwner { .. }
            | Self::MissingField { .. }
            | Self::MissingColumn { .. }
            | Self::NoSheet
            | Self::Json(_) => ErrorCategory::MalformedData,
            Self::BudgetExhausted { .. } => ErrorCategory::Budget,
            Self::Credentials(_) | Self::CredentialEncoding(_) => ErrorCategory::Credentials,
        }
    }
}
