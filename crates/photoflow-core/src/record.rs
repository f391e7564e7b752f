//! Photo records: per-item identity, processing state, and image artifact.
//!
//! A record's name and URL never change after creation. State follows a
//! strict forward progression (`New -> Downloaded -> Filtered`, with `Failed`
//! as the download failure sink); the artifact slot is overwritten in place
//! by each stage on success.

use image::DynamicImage;
use url::Url;

/// Processing state of one photo record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Nothing fetched yet.
    New,
    /// Raw bytes fetched and decoded; filter not yet applied.
    Downloaded,
    /// Tone filter applied. Terminal.
    Filtered,
    /// Download failed. Terminal.
    Failed,
}

impl RecordState {
    /// True for states that never admit another stage.
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordState::Filtered | RecordState::Failed)
    }
}

/// The image payload slot of a record.
///
/// Starts as a placeholder; a successful download replaces it with the decoded
/// image, a successful filter replaces that, and a failed download replaces it
/// with the failure placeholder. A failed filter leaves it untouched.
#[derive(Debug, Clone, Default)]
pub enum Artifact {
    /// Initial value shown while nothing has been fetched.
    #[default]
    Placeholder,
    /// Shown for records whose download failed.
    FailedPlaceholder,
    /// A decoded (and possibly filtered) image.
    Image(DynamicImage),
}

impl Artifact {
    /// The decoded image, if this slot holds one.
    pub fn image(&self) -> Option<&DynamicImage> {
        match self {
            Artifact::Image(img) => Some(img),
            Artifact::Placeholder | Artifact::FailedPlaceholder => None,
        }
    }
}

/// One list item: immutable identity plus mutable processing state.
#[derive(Debug, Clone)]
pub struct PhotoRecord {
    name: String,
    url: Url,
    pub state: RecordState,
    pub artifact: Artifact,
}

impl PhotoRecord {
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
            state: RecordState::New,
            artifact: Artifact::Placeholder,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// The ordered, index-addressable photo list. Owned by the UI layer; the
/// pipeline mutates records through it but never adds or removes entries.
#[derive(Debug, Default)]
pub struct PhotoLibrary {
    records: Vec<PhotoRecord>,
}

impl PhotoLibrary {
    pub fn new(records: Vec<PhotoRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PhotoRecord> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PhotoRecord> {
        self.records.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhotoRecord> {
        self.records.iter()
    }
}
