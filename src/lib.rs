// attendance-record: attendance record lifecycle and document export
//
// An `AttendanceEditor` owns one consultation record while it is being edited:
// it decides between create and update, promotes a new record to its server id
// in place, and guards navigation away from unsaved work. Rich-text fields are
// exported by normalizing their HTML, rasterizing it and slicing the raster
// over A4 pages.

pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod model;
pub mod normalize;
pub mod render;
pub mod requests;
pub mod services;
pub mod viewer;

pub use config::RenderConfig;
pub use editor::{AttendanceEditor, Collaborators, NavigationKind, NavigationOutcome, RecordState};
pub use error::{ExportError, RenderError, SaveError, TransportError, ValidationError};
pub use export::{DocumentHost, ExportJob, ExportOutcome};
pub use model::{AttendanceRecord, Patient, RichTextField, Route};
pub use normalize::{normalize, HtmlNormalizer};
pub use render::{plan_pages, ImageSurface, PageSlice, PaginatedRenderer, RenderedDocument, Surface};
pub use requests::{RequestCounter, RequestGuard};
pub use viewer::{DocumentViewer, ObjectUrlStore};
