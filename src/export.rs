// attendance-record: export jobs

use crate::model::RichTextField;
use crate::normalize::HtmlNormalizer;
use crate::render::{RenderedDocument, Surface};

/// One request to turn a rich-text field into a document.
///
/// The normalized HTML is computed once, when the job is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    source_field: RichTextField,
    normalized_html: String,
}

impl ExportJob {
    pub fn new(source_field: RichTextField, raw_html: &str, normalizer: &HtmlNormalizer) -> Self {
        Self {
            source_field,
            normalized_html: normalizer.normalize(raw_html),
        }
    }

    pub fn source_field(&self) -> RichTextField {
        self.source_field
    }

    pub fn normalized_html(&self) -> &str {
        &self.normalized_html
    }
}

/// Mounts an export job's HTML somewhere it can be rasterized.
pub trait DocumentHost {
    type Surface: Surface;

    /// `None` when the content could not be mounted.
    fn mount(&self, job: &ExportJob) -> Option<Self::Surface>;
}

#[derive(Debug, Clone)]
pub enum ExportOutcome {
    /// Generated by the repository.
    Server {
        field: RichTextField,
        filename: String,
        bytes: Vec<u8>,
    },
    /// Rendered locally from the field's HTML.
    Rendered(RenderedDocument),
    /// The host had nothing mounted; nothing was produced.
    Unavailable,
}
