// attendance-record: collaborator contracts
//
// Everything runs on a single-threaded executor, so none of these futures
// need to be `Send`.
#![allow(async_fn_in_trait)]

use crate::error::TransportError;
use crate::model::{AttendancePayload, AttendanceRecord, Patient, RichTextField, Route};

/// Persistence for attendance records.
pub trait AttendanceRepository {
    /// `Ok(None)` when the server has no such record.
    async fn get_by_id(&self, id: i64) -> Result<Option<AttendanceRecord>, TransportError>;

    /// Persist a new record; the server assigns the id.
    async fn create(&self, payload: &AttendancePayload) -> Result<AttendanceRecord, TransportError>;

    async fn update(&self, payload: &AttendancePayload) -> Result<AttendanceRecord, TransportError>;

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<AttendanceRecord>, TransportError>;

    /// Server-side PDF for the fields that support it (see
    /// [`RichTextField::has_server_pdf`]).
    async fn generate_pdf(&self, id: i64, field: RichTextField) -> Result<Vec<u8>, TransportError>;
}

pub trait PatientDirectory {
    async fn get_all(&self) -> Result<Vec<Patient>, TransportError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Patient>, TransportError>;
}

/// Fire-and-forget user messages.
pub trait Notifier {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn info(&self, message: &str);
}

/// Yes/no gate for destructive navigation.
pub trait ConfirmationPrompt {
    async fn confirm(&self, message: &str) -> bool;
}

/// Where the editor is mounted.
pub trait Navigator {
    fn current(&self) -> Route;

    /// Rewrite the current location without leaving or rebuilding the screen.
    fn replace(&self, route: Route);

    /// Leave the current screen.
    fn navigate(&self, route: Route);
}
