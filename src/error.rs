// attendance-record: error taxonomy

use thiserror::Error;

/// Local, inline-only failures. Never transmitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A patient must be selected")]
    MissingPatient,
    #[error("Patient {0} does not exist")]
    UnknownPatient(i64),
    #[error("Please fill in the required fields: {}", .0.join(", "))]
    InvalidFields(Vec<String>),
}

/// A repository or directory call failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request failed with status {status}")]
    Status {
        status: u16,
        status_text: Option<String>,
        body_message: Option<String>,
    },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Resource not found")]
    NotFound,
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl TransportError {
    /// A missing resource, whether reported as such or as a bare 404.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TransportError::NotFound | TransportError::Status { status: 404, .. }
        )
    }

    /// Text shown to the user in a notification.
    ///
    /// Prefers the server-provided message, then the transport message, then
    /// a bare status line.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Status {
                status,
                status_text,
                body_message,
            } => match (body_message, status_text) {
                (Some(msg), _) if !msg.trim().is_empty() => msg.clone(),
                (_, Some(text)) if !text.trim().is_empty() => {
                    format!("Status {}: {}", status, text)
                }
                _ => format!("Status {}: Unknown error", status),
            },
            TransportError::Network(msg) | TransportError::Decode(msg) => msg.clone(),
            TransportError::NotFound => "Resource not found".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to rasterize content: {0}")]
    Rasterize(String),
    #[error("Rasterized content is empty")]
    EmptyRaster,
    #[error("Failed to create PDF: {0}")]
    Pdf(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    #[error("A save is already in progress")]
    AlreadySaving,
    #[error("No record is open")]
    NoRecord,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to save attendance: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error("Failed to generate PDF on the server: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
