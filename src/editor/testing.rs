// attendance-record: in-memory collaborators for editor tests

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use ::image::{DynamicImage, Rgb, RgbImage};

use super::{AttendanceEditor, Collaborators};
use crate::error::TransportError;
use crate::export::{DocumentHost, ExportJob};
use crate::model::wire::parse_timestamp;
use crate::model::{AttendancePayload, AttendanceRecord, Patient, RichTextField, Route};
use crate::render::ImageSurface;
use crate::requests::RequestCounter;
use crate::services::{AttendanceRepository, ConfirmationPrompt, Navigator, Notifier, PatientDirectory};

pub type TestEditor =
    AttendanceEditor<FakeRepository, FakeDirectory, RecordingNotifier, ScriptedPrompt, FakeNavigator>;

pub async fn open_editor(repo: FakeRepository, route: Route, param: Option<&str>) -> TestEditor {
    open_editor_with_prompt(repo, route, param, true).await
}

pub async fn open_editor_with_prompt(
    repo: FakeRepository,
    route: Route,
    param: Option<&str>,
    answer: bool,
) -> TestEditor {
    let services = Collaborators {
        repository: repo,
        patients: FakeDirectory::default(),
        notifier: RecordingNotifier::default(),
        prompt: ScriptedPrompt::answering(answer),
        navigator: FakeNavigator::at(route),
        requests: RequestCounter::new(),
    };
    AttendanceEditor::open(services, param).await
}

pub fn stored_record(id: i64, patient_id: i64) -> AttendanceRecord {
    let mut record = AttendanceRecord::new_at(parse_timestamp("2025-03-10T14:30:00Z").unwrap());
    record.id = id;
    record.patient_id = patient_id;
    record.subjective_description = Some("<p>Dor lombar há 3 dias</p>".into());
    record.prescription = Some("<p>Dipirona 500mg</p>".into());
    record
}

// ============================================================================
// Repository
// ============================================================================

#[derive(Default)]
pub struct FakeRepository {
    pub records: RefCell<HashMap<i64, AttendanceRecord>>,
    pub next_id: Cell<i64>,
    pub fetched: RefCell<Vec<i64>>,
    pub created: RefCell<Vec<AttendancePayload>>,
    pub updated: RefCell<Vec<AttendancePayload>>,
    pub pdf_requests: RefCell<Vec<(i64, RichTextField)>>,
    /// Reply to create/update with the id alone.
    pub sparse_replies: Cell<bool>,
    /// Create/update never complete.
    pub stall_saves: Cell<bool>,
    failure: RefCell<Option<TransportError>>,
}

impl FakeRepository {
    pub fn with_record(record: AttendanceRecord) -> Self {
        let repo = Self::default();
        repo.insert(record);
        repo
    }

    pub fn insert(&self, record: AttendanceRecord) {
        self.records.borrow_mut().insert(record.id, record);
    }

    pub fn fail_with(&self, error: TransportError) {
        *self.failure.borrow_mut() = Some(error);
    }

    fn check(&self) -> Result<(), TransportError> {
        match self.failure.borrow().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn reply(&self, record: AttendanceRecord) -> Result<AttendanceRecord, TransportError> {
        if self.stall_saves.get() {
            std::future::pending::<()>().await;
        }
        self.insert(record.clone());
        if self.sparse_replies.get() {
            let sparse = serde_json::json!({ "id": record.id });
            return serde_json::from_value(sparse).map_err(|e| TransportError::Decode(e.to_string()));
        }
        Ok(record)
    }

    fn to_record(payload: &AttendancePayload, id: i64) -> AttendanceRecord {
        let mut record = AttendanceRecord::new_at(payload.attended_at);
        record.id = id;
        record.patient_id = payload.patient_id;
        record.return_contact_date = payload.return_contact_date;
        record.subjective_description = payload.subjective_description.clone();
        record.objective_notes = payload.objective_notes.clone();
        record.therapy_plan = payload.therapy_plan.clone();
        record.nursing_notes = payload.nursing_notes.clone();
        record.budget = payload.budget.clone();
        record.prescription = payload.prescription.clone();
        record
    }
}

impl AttendanceRepository for FakeRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<AttendanceRecord>, TransportError> {
        self.fetched.borrow_mut().push(id);
        self.check()?;
        Ok(self.records.borrow().get(&id).cloned())
    }

    async fn create(&self, payload: &AttendancePayload) -> Result<AttendanceRecord, TransportError> {
        self.check()?;
        self.created.borrow_mut().push(payload.clone());
        let id = match self.next_id.get() {
            0 => self.records.borrow().len() as i64 + 1,
            id => id,
        };
        self.reply(Self::to_record(payload, id)).await
    }

    async fn update(&self, payload: &AttendancePayload) -> Result<AttendanceRecord, TransportError> {
        self.check()?;
        self.updated.borrow_mut().push(payload.clone());
        self.reply(Self::to_record(payload, payload.id)).await
    }

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<AttendanceRecord>, TransportError> {
        self.check()?;
        Ok(self
            .records
            .borrow()
            .values()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn generate_pdf(&self, id: i64, field: RichTextField) -> Result<Vec<u8>, TransportError> {
        self.check()?;
        self.pdf_requests.borrow_mut().push((id, field));
        Ok(b"%PDF-server".to_vec())
    }
}

// ============================================================================
// Directory, notifier, prompt, navigator, host
// ============================================================================

pub struct FakeDirectory {
    patients: Vec<Patient>,
}

impl Default for FakeDirectory {
    fn default() -> Self {
        let patient = |id: i64, name: &str| Patient {
            id,
            full_name: name.to_string(),
            birth_date: None,
            cpf: None,
            contacts: Vec::new(),
        };
        Self {
            patients: vec![patient(7, "Ana Souza"), patient(8, "Bruno Lima")],
        }
    }
}

impl PatientDirectory for FakeDirectory {
    async fn get_all(&self) -> Result<Vec<Patient>, TransportError> {
        Ok(self.patients.clone())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Patient>, TransportError> {
        Ok(self.patients.iter().find(|p| p.id == id).cloned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Info,
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: RefCell<Vec<(Level, String)>>,
}

impl RecordingNotifier {
    fn with_level(&self, level: Level) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.with_level(Level::Success)
    }

    pub fn errors(&self) -> Vec<String> {
        self.with_level(Level::Error)
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.messages.borrow_mut().push((Level::Success, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages.borrow_mut().push((Level::Error, message.to_string()));
    }

    fn info(&self, message: &str) {
        self.messages.borrow_mut().push((Level::Info, message.to_string()));
    }
}

pub struct ScriptedPrompt {
    answer: Cell<bool>,
    pub asked: RefCell<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: Cell::new(answer),
            asked: RefCell::new(Vec::new()),
        }
    }
}

impl ConfirmationPrompt for ScriptedPrompt {
    async fn confirm(&self, message: &str) -> bool {
        self.asked.borrow_mut().push(message.to_string());
        self.answer.get()
    }
}

pub struct FakeNavigator {
    current: RefCell<Route>,
    pub replaced: RefCell<Vec<Route>>,
    pub navigated: RefCell<Vec<Route>>,
}

impl FakeNavigator {
    pub fn at(route: Route) -> Self {
        Self {
            current: RefCell::new(route),
            replaced: RefCell::new(Vec::new()),
            navigated: RefCell::new(Vec::new()),
        }
    }
}

impl Navigator for FakeNavigator {
    fn current(&self) -> Route {
        *self.current.borrow()
    }

    fn replace(&self, route: Route) {
        *self.current.borrow_mut() = route;
        self.replaced.borrow_mut().push(route);
    }

    fn navigate(&self, route: Route) {
        *self.current.borrow_mut() = route;
        self.navigated.borrow_mut().push(route);
    }
}

pub struct FakeHost {
    mounted: bool,
    pub mounted_html: RefCell<Vec<String>>,
}

impl FakeHost {
    pub fn mounted() -> Self {
        Self {
            mounted: true,
            mounted_html: RefCell::new(Vec::new()),
        }
    }

    pub fn unmounted() -> Self {
        Self {
            mounted: false,
            mounted_html: RefCell::new(Vec::new()),
        }
    }
}

impl DocumentHost for FakeHost {
    type Surface = ImageSurface;

    fn mount(&self, job: &ExportJob) -> Option<ImageSurface> {
        if !self.mounted {
            return None;
        }
        self.mounted_html.borrow_mut().push(job.normalized_html().to_string());
        Some(ImageSurface::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            120,
            80,
            Rgb([255, 255, 255]),
        ))))
    }
}
