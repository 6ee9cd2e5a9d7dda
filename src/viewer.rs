// attendance-record: document viewer and object URLs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::export::ExportOutcome;

const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone)]
struct Blob {
    mime: String,
    bytes: Vec<u8>,
}

/// Addressable in-memory blobs. Every URL handed out must be revoked.
#[derive(Debug, Default)]
pub struct ObjectUrlStore {
    live: Mutex<HashMap<String, Blob>>,
}

impl ObjectUrlStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn create(&self, bytes: Vec<u8>, mime: &str) -> String {
        let url = format!("blob:{}", Uuid::new_v4());
        self.lock().insert(
            url.clone(),
            Blob {
                mime: mime.to_string(),
                bytes,
            },
        );
        url
    }

    /// Returns false when the URL was unknown or already revoked.
    pub fn revoke(&self, url: &str) -> bool {
        self.lock().remove(url).is_some()
    }

    pub fn resolve(&self, url: &str) -> Option<(String, Vec<u8>)> {
        self.lock()
            .get(url)
            .map(|blob| (blob.mime.clone(), blob.bytes.clone()))
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Blob>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownDocument {
    pub filename: String,
    pub url: String,
    pub page_count: Option<usize>,
}

/// Shows at most one document at a time.
///
/// Replacing, closing or dropping the viewer revokes the previous URL.
#[derive(Debug)]
pub struct DocumentViewer {
    store: Arc<ObjectUrlStore>,
    current: Option<ShownDocument>,
}

impl DocumentViewer {
    pub fn new(store: Arc<ObjectUrlStore>) -> Self {
        Self {
            store,
            current: None,
        }
    }

    /// Show an export result. `Unavailable` leaves the viewer untouched.
    pub fn show(&mut self, outcome: ExportOutcome) -> Option<&ShownDocument> {
        let (filename, bytes, page_count) = match outcome {
            ExportOutcome::Rendered(doc) => {
                let pages = doc.page_count();
                (doc.filename, doc.bytes, Some(pages))
            }
            ExportOutcome::Server {
                filename, bytes, ..
            } => (filename, bytes, None),
            ExportOutcome::Unavailable => return None,
        };

        self.close();
        let url = self.store.create(bytes, PDF_MIME);
        tracing::debug!(url = %url, filename = %filename, "Showing document");
        self.current = Some(ShownDocument {
            filename,
            url,
            page_count,
        });
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&ShownDocument> {
        self.current.as_ref()
    }

    pub fn close(&mut self) {
        if let Some(shown) = self.current.take() {
            self.store.revoke(&shown.url);
        }
    }
}

impl Drop for DocumentViewer {
    fn drop(&mut self) {
        self.close();
    }
}
