// attendance-record: attendance editor (save coordinator)
//
// Owns the in-memory record for one editor screen. Draft and final saves share
// the same validate → payload → persist path and differ only in what happens
// after success.

mod guard;
#[cfg(test)]
mod testing;

pub use guard::{NavigationKind, NavigationOutcome};

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::error::{ExportError, SaveError, TransportError, ValidationError};
use crate::export::{DocumentHost, ExportJob, ExportOutcome};
use crate::model::wire::{local_input_to_timestamp, timestamp_to_local_input};
use crate::model::{
    parse_record_param, AttendancePayload, AttendanceRecord, FieldHistory, Patient,
    RichTextField, Route,
};
use crate::normalize::HtmlNormalizer;
use crate::render::{document_filename, PaginatedRenderer};
use crate::requests::RequestCounter;
use crate::services::{AttendanceRepository, ConfirmationPrompt, Navigator, Notifier, PatientDirectory};

const LOAD_FAILED: &str = "Failed to load attendance.";
const SAVE_FAILED: &str = "Failed to save attendance.";
const DRAFT_SAVED: &str = "Attendance draft saved.";
const FINAL_SAVED: &str = "Attendance saved.";
const SAVED_BEFORE_EXPORT: &str = "Attendance saved before export.";

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Never persisted (`id == 0`).
    New,
    /// Has a server identity.
    EditingExisting,
    /// A persist call is in flight.
    Saving,
    /// Final save done; the editor has navigated away.
    Saved,
}

/// UI-side form bookkeeping, separate from the entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    dirty: bool,
    invalid_fields: Vec<String>,
    attended_at_local: Option<String>,
}

impl FormState {
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Fields the form currently reports as invalid.
    pub fn set_invalid_fields(&mut self, fields: Vec<String>) {
        self.invalid_fields = fields;
    }

    pub fn attended_at_local(&self) -> Option<&str> {
        self.attended_at_local.as_deref()
    }
}

/// Everything the editor talks to.
pub struct Collaborators<R, P, N, C, V> {
    pub repository: R,
    pub patients: P,
    pub notifier: N,
    pub prompt: C,
    pub navigator: V,
    pub requests: Arc<RequestCounter>,
}

/// Holds `saving` high for as long as it lives, including when the owning
/// future is dropped mid-call.
struct SavingFlag<'a>(&'a mut bool);

impl<'a> SavingFlag<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        SavingFlag(flag)
    }
}

impl Drop for SavingFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

// ============================================================================
// Editor
// ============================================================================

pub struct AttendanceEditor<R, P, N, C, V> {
    services: Collaborators<R, P, N, C, V>,
    record: AttendanceRecord,
    phase: RecordState,
    saving: bool,
    form: FormState,
    patient_list: Vec<Patient>,
    error: Option<String>,
}

impl<R, P, N, C, V> AttendanceEditor<R, P, N, C, V>
where
    R: AttendanceRepository,
    P: PatientDirectory,
    N: Notifier,
    C: ConfirmationPrompt,
    V: Navigator,
{
    /// Open the editor for `param`: absent, `"new"` or non-numeric opens a
    /// blank record, a numeric id loads that record.
    pub async fn open(services: Collaborators<R, P, N, C, V>, param: Option<&str>) -> Self {
        let mut editor = Self {
            services,
            record: AttendanceRecord::new_at(Utc::now()),
            phase: RecordState::New,
            saving: false,
            form: FormState::default(),
            patient_list: Vec::new(),
            error: None,
        };
        editor.load_patients().await;

        match parse_record_param(param) {
            Some(id) => editor.load_record(id).await,
            None => editor.reset_new(),
        }
        editor
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> RecordState {
        if self.saving {
            RecordState::Saving
        } else {
            self.phase
        }
    }

    pub fn record(&self) -> &AttendanceRecord {
        &self.record
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    /// Inline error shown next to the form.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patient_list
    }

    pub fn services(&self) -> &Collaborators<R, P, N, C, V> {
        &self.services
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    pub fn select_patient(&mut self, patient_id: i64) {
        self.record.patient_id = patient_id;
        self.form.mark_dirty();
    }

    pub fn set_field(&mut self, field: RichTextField, html: Option<String>) {
        self.record.set_field(field, html);
        self.form.mark_dirty();
    }

    pub fn set_return_contact_date(&mut self, date: Option<NaiveDate>) {
        self.record.return_contact_date = date;
        self.form.mark_dirty();
    }

    /// Value of the `datetime-local` input (`yyyy-MM-ddTHH:mm`).
    pub fn set_attended_at_local(&mut self, local: &str) {
        self.form.attended_at_local = Some(local.to_string());
        self.form.mark_dirty();
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    async fn load_patients(&mut self) {
        let _request = self.services.requests.track();
        match self.services.patients.get_all().await {
            Ok(patients) => self.patient_list = patients,
            Err(e) => tracing::warn!("Failed to load patients: {e}"),
        }
    }

    async fn load_record(&mut self, id: i64) {
        let result = {
            let _request = self.services.requests.track();
            self.services.repository.get_by_id(id).await
        };

        match result {
            Ok(Some(mut record)) => {
                if record.id == 0 {
                    record.id = id;
                }
                let attended_at = *record.attended_at.get_or_insert_with(Utc::now);
                self.form = FormState {
                    attended_at_local: Some(timestamp_to_local_input(&attended_at)),
                    ..FormState::default()
                };
                self.record = record;
                self.phase = RecordState::EditingExisting;
                self.error = None;
                tracing::debug!(id, "Loaded attendance");
            }
            Ok(None) => {
                tracing::info!(id, "Attendance not found, opening a new record");
                self.reset_new();
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(id, "Attendance not found, opening a new record");
                self.reset_new();
            }
            Err(e) => {
                tracing::warn!(id, "Failed to load attendance: {e}");
                self.reset_new();
                self.error = Some(LOAD_FAILED.to_string());
            }
        }
    }

    fn reset_new(&mut self) {
        let now = Utc::now();
        self.record = AttendanceRecord::new_at(now);
        self.phase = RecordState::New;
        self.form = FormState {
            attended_at_local: Some(timestamp_to_local_input(&now)),
            ..FormState::default()
        };
        self.error = None;
    }

    // ------------------------------------------------------------------
    // Saving
    // ------------------------------------------------------------------

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.form.invalid_fields.is_empty() {
            return Err(ValidationError::InvalidFields(self.form.invalid_fields.clone()));
        }
        let patient_id = self.record.patient_id;
        if patient_id <= 0 {
            return Err(ValidationError::MissingPatient);
        }
        if !self.patient_list.is_empty() && !self.patient_list.iter().any(|p| p.id == patient_id) {
            return Err(ValidationError::UnknownPatient(patient_id));
        }
        Ok(())
    }

    /// Persist and stay on the screen.
    pub async fn save_draft(&mut self) -> Result<(), SaveError> {
        self.persist().await?;
        self.form.mark_clean();
        self.services.notifier.success(DRAFT_SAVED);
        Ok(())
    }

    /// Persist and return to the listing.
    pub async fn save_final(&mut self) -> Result<(), SaveError> {
        self.persist().await?;
        self.form.mark_clean();
        self.services.notifier.success(FINAL_SAVED);
        self.phase = RecordState::Saved;
        self.services.navigator.navigate(Route::Listing);
        Ok(())
    }

    async fn persist(&mut self) -> Result<(), SaveError> {
        if self.saving {
            tracing::debug!(id = self.record.id, "Save rejected, another save is in flight");
            return Err(SaveError::AlreadySaving);
        }
        if self.phase == RecordState::Saved {
            return Err(SaveError::NoRecord);
        }
        self.error = None;

        if let Err(e) = self.validate() {
            self.error = Some(e.to_string());
            return Err(e.into());
        }

        let attended_at = self
            .form
            .attended_at_local
            .as_deref()
            .and_then(local_input_to_timestamp)
            .or(self.record.attended_at)
            .unwrap_or_else(Utc::now);
        let payload = AttendancePayload::from_record(&self.record, attended_at);

        let result = {
            let _saving = SavingFlag::raise(&mut self.saving);
            let _request = self.services.requests.track();
            if payload.is_create() {
                self.services.repository.create(&payload).await
            } else {
                self.services.repository.update(&payload).await
            }
        };

        match result {
            Ok(saved) => {
                let was_new = !self.record.is_persisted();
                self.record.attended_at = Some(attended_at);
                self.record.merge_from(saved);
                let attended_at = self.record.attended_at.unwrap_or(attended_at);
                self.form.attended_at_local = Some(timestamp_to_local_input(&attended_at));
                if was_new && self.record.is_persisted() {
                    self.promote();
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(id = payload.id, "Failed to save attendance: {e}");
                self.error = Some(SAVE_FAILED.to_string());
                self.services.notifier.error(&e.user_message());
                Err(e.into())
            }
        }
    }

    /// `New → EditingExisting` in place, rewriting a "new" location to the id.
    fn promote(&mut self) {
        let id = self.record.id;
        self.phase = RecordState::EditingExisting;
        if self.services.navigator.current().encodes_new() {
            self.services.navigator.replace(Route::Record(id));
        }
        tracing::info!(id, "Attendance created");
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Export one field as a document, saving first when the record is new or
    /// has unsaved edits.
    pub async fn export_document<H: DocumentHost>(
        &mut self,
        field: RichTextField,
        host: &H,
        renderer: &PaginatedRenderer,
    ) -> Result<ExportOutcome, ExportError> {
        if self.phase == RecordState::New || self.form.is_dirty() {
            self.persist().await?;
            self.form.mark_clean();
            self.services.notifier.info(SAVED_BEFORE_EXPORT);
        }

        let id = self.record.id;
        if field.has_server_pdf() {
            let result = {
                let _request = self.services.requests.track();
                self.services.repository.generate_pdf(id, field).await
            };
            let bytes = result.map_err(|e| {
                tracing::warn!(id, field = %field, "Server PDF generation failed: {e}");
                self.services.notifier.error(&e.user_message());
                e
            })?;
            let filename = document_filename(Some(field.title()), &renderer.config().default_title);
            return Ok(ExportOutcome::Server {
                field,
                filename,
                bytes,
            });
        }

        let normalizer = HtmlNormalizer::from(renderer.config());
        let job = ExportJob::new(field, self.record.field(field).unwrap_or(""), &normalizer);
        let surface = host.mount(&job);
        match renderer.render(surface.as_ref(), Some(field.title())).await? {
            Some(doc) => Ok(ExportOutcome::Rendered(doc)),
            None => Ok(ExportOutcome::Unavailable),
        }
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Earlier values of `field` for the selected patient, newest first.
    pub async fn field_history(&self, field: RichTextField) -> Result<FieldHistory, TransportError> {
        let patient_id = self.record.patient_id;
        if patient_id <= 0 {
            return Ok(FieldHistory::collect(patient_id, field, &[]));
        }
        let records = {
            let _request = self.services.requests.track();
            self.services.repository.list_by_patient(patient_id).await?
        };
        let earlier: Vec<AttendanceRecord> = records
            .into_iter()
            .filter(|r| r.id != self.record.id || self.record.id == 0)
            .collect();
        Ok(FieldHistory::collect(patient_id, field, &earlier))
    }
}
