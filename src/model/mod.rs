// attendance-record: domain model

mod patient;
pub mod wire;

pub use patient::{normalize_cpf, Patient, PatientContact};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Rich-text fields
// ============================================================================

/// The independently editable and exportable rich-text sections of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RichTextField {
    SubjectiveDescription,
    ObjectiveNotes,
    TherapyPlan,
    #[serde(alias = "nursing_notes")]
    NursingNotes,
    Budget,
    Prescription,
}

impl RichTextField {
    pub const ALL: [RichTextField; 6] = [
        RichTextField::SubjectiveDescription,
        RichTextField::ObjectiveNotes,
        RichTextField::TherapyPlan,
        RichTextField::NursingNotes,
        RichTextField::Budget,
        RichTextField::Prescription,
    ];

    /// Wire key of the field.
    pub fn key(self) -> &'static str {
        match self {
            RichTextField::SubjectiveDescription => "subjectiveDescription",
            RichTextField::ObjectiveNotes => "objectiveNotes",
            RichTextField::TherapyPlan => "therapyPlan",
            RichTextField::NursingNotes => "nursingNotes",
            RichTextField::Budget => "budget",
            RichTextField::Prescription => "prescription",
        }
    }

    /// Human title, used for exported document names.
    pub fn title(self) -> &'static str {
        match self {
            RichTextField::SubjectiveDescription => "Subjective description",
            RichTextField::ObjectiveNotes => "Objective notes",
            RichTextField::TherapyPlan => "Therapy plan",
            RichTextField::NursingNotes => "Nursing notes",
            RichTextField::Budget => "Budget",
            RichTextField::Prescription => "Prescription",
        }
    }

    /// Whether the repository can generate this document server-side.
    pub fn has_server_pdf(self) -> bool {
        matches!(
            self,
            RichTextField::TherapyPlan | RichTextField::Budget | RichTextField::Prescription
        )
    }
}

impl fmt::Display for RichTextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for RichTextField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // One legacy alias: nursing notes used to ship snake_cased.
        if s == "nursing_notes" {
            return Ok(RichTextField::NursingNotes);
        }
        RichTextField::ALL
            .into_iter()
            .find(|f| f.key() == s)
            .ok_or_else(|| format!("unknown field: {s}"))
    }
}

// ============================================================================
// Attendance record
// ============================================================================

/// Minimal patient view embedded in attendance responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: i64,
    #[serde(default)]
    pub full_name: String,
}

/// One consultation entry tied to a patient.
///
/// `id == 0` means the record has never been round-tripped through the
/// repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default, deserialize_with = "wire::null_as_zero")]
    pub id: i64,
    #[serde(default, deserialize_with = "wire::null_as_zero")]
    pub patient_id: i64,
    /// `None` only when a response left it out.
    #[serde(default, with = "wire::optional_timestamp")]
    pub attended_at: Option<DateTime<Utc>>,
    #[serde(default, with = "wire::calendar_date")]
    pub return_contact_date: Option<NaiveDate>,
    #[serde(default)]
    pub subjective_description: Option<String>,
    #[serde(default)]
    pub objective_notes: Option<String>,
    #[serde(default)]
    pub therapy_plan: Option<String>,
    #[serde(default, alias = "nursing_notes")]
    pub nursing_notes: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub prescription: Option<String>,
    #[serde(default, skip_serializing)]
    pub patient: Option<PatientSummary>,
}

impl AttendanceRecord {
    /// Empty, unsaved record stamped with the given time.
    pub fn new_at(attended_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            patient_id: 0,
            attended_at: Some(attended_at),
            return_contact_date: None,
            subjective_description: None,
            objective_notes: None,
            therapy_plan: None,
            nursing_notes: None,
            budget: None,
            prescription: None,
            patient: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    pub fn field(&self, field: RichTextField) -> Option<&str> {
        match field {
            RichTextField::SubjectiveDescription => self.subjective_description.as_deref(),
            RichTextField::ObjectiveNotes => self.objective_notes.as_deref(),
            RichTextField::TherapyPlan => self.therapy_plan.as_deref(),
            RichTextField::NursingNotes => self.nursing_notes.as_deref(),
            RichTextField::Budget => self.budget.as_deref(),
            RichTextField::Prescription => self.prescription.as_deref(),
        }
    }

    pub fn set_field(&mut self, field: RichTextField, value: Option<String>) {
        let slot = match field {
            RichTextField::SubjectiveDescription => &mut self.subjective_description,
            RichTextField::ObjectiveNotes => &mut self.objective_notes,
            RichTextField::TherapyPlan => &mut self.therapy_plan,
            RichTextField::NursingNotes => &mut self.nursing_notes,
            RichTextField::Budget => &mut self.budget,
            RichTextField::Prescription => &mut self.prescription,
        };
        *slot = value;
    }

    /// Merge a server response into this record in place.
    ///
    /// Identity and server-owned fields are taken from the response. Field
    /// values the response omits are kept, so text already submitted is never
    /// blanked by a sparse reply.
    pub fn merge_from(&mut self, saved: AttendanceRecord) {
        if saved.id > 0 {
            self.id = saved.id;
        }
        if saved.patient_id > 0 {
            self.patient_id = saved.patient_id;
        }
        if saved.attended_at.is_some() {
            self.attended_at = saved.attended_at;
        }
        if saved.return_contact_date.is_some() {
            self.return_contact_date = saved.return_contact_date;
        }
        for field in RichTextField::ALL {
            if let Some(value) = saved.field(field) {
                self.set_field(field, Some(value.to_string()));
            }
        }
        if saved.patient.is_some() {
            self.patient = saved.patient;
        }
    }
}

// ============================================================================
// Outgoing payload
// ============================================================================

/// Body sent to the repository on create and update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePayload {
    pub id: i64,
    pub patient_id: i64,
    #[serde(with = "wire::timestamp")]
    pub attended_at: DateTime<Utc>,
    #[serde(with = "wire::calendar_date")]
    pub return_contact_date: Option<NaiveDate>,
    pub subjective_description: Option<String>,
    pub objective_notes: Option<String>,
    pub therapy_plan: Option<String>,
    pub nursing_notes: Option<String>,
    pub budget: Option<String>,
    pub prescription: Option<String>,
}

impl AttendancePayload {
    pub fn from_record(record: &AttendanceRecord, attended_at: DateTime<Utc>) -> Self {
        Self {
            id: record.id,
            patient_id: record.patient_id,
            attended_at,
            return_contact_date: record.return_contact_date,
            subjective_description: record.subjective_description.clone(),
            objective_notes: record.objective_notes.clone(),
            therapy_plan: record.therapy_plan.clone(),
            nursing_notes: record.nursing_notes.clone(),
            budget: record.budget.clone(),
            prescription: record.prescription.clone(),
        }
    }

    pub fn is_create(&self) -> bool {
        self.id == 0
    }
}

// ============================================================================
// Per-patient field history
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValueItem {
    pub attendance_id: i64,
    #[serde(default, with = "wire::optional_timestamp")]
    pub attended_at: Option<DateTime<Utc>>,
    pub value: String,
}

/// Previous values of one field across a patient's attendances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldHistory {
    pub patient_id: i64,
    pub field: RichTextField,
    pub items: Vec<FieldValueItem>,
}

impl FieldHistory {
    /// Newest first; blank values skipped.
    pub fn collect(patient_id: i64, field: RichTextField, records: &[AttendanceRecord]) -> Self {
        let mut items: Vec<FieldValueItem> = records
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .filter_map(|r| {
                let value = r.field(field)?.trim();
                (!value.is_empty()).then(|| FieldValueItem {
                    attendance_id: r.id,
                    attended_at: r.attended_at,
                    value: value.to_string(),
                })
            })
            .collect();
        items.sort_by(|a, b| b.attended_at.cmp(&a.attended_at));
        Self {
            patient_id,
            field,
            items,
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

pub const NEW_RECORD_MARKER: &str = "new";
/// Older links used the Portuguese marker.
const LEGACY_NEW_RECORD_MARKER: &str = "novo";
const LISTING_PATH: &str = "/attendances";

/// Locations the attendance editor can be mounted at or leave to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Listing,
    NewRecord,
    Record(i64),
}

impl Route {
    pub fn encodes_new(&self) -> bool {
        matches!(self, Route::NewRecord)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Listing => f.write_str(LISTING_PATH),
            Route::NewRecord => write!(f, "{}/{}", LISTING_PATH, NEW_RECORD_MARKER),
            Route::Record(id) => write!(f, "{}/{}", LISTING_PATH, id),
        }
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim().trim_end_matches('/');
        let rest = path
            .strip_prefix(LISTING_PATH)
            .ok_or_else(|| format!("not an attendance route: {s}"))?;
        match rest.strip_prefix('/') {
            None if rest.is_empty() => Ok(Route::Listing),
            Some(NEW_RECORD_MARKER) | Some(LEGACY_NEW_RECORD_MARKER) => Ok(Route::NewRecord),
            Some(segment) => match segment.parse::<i64>() {
                Ok(id) if id > 0 => Ok(Route::Record(id)),
                _ => Err(format!("invalid attendance id: {segment}")),
            },
            None => Err(format!("not an attendance route: {s}")),
        }
    }
}

/// Interpret the editor's id parameter.
///
/// Returns the id to fetch, or `None` when a new record should be opened:
/// absent, the "new" marker, zero, or anything non-numeric.
pub fn parse_record_param(param: Option<&str>) -> Option<i64> {
    let param = param?.trim();
    if param == NEW_RECORD_MARKER || param == LEGACY_NEW_RECORD_MARKER {
        return None;
    }
    param.parse::<i64>().ok().filter(|id| *id > 0)
}
