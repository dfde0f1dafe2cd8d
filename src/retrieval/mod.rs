//! Retrieval collaborators and per-run retrieval state.
//!
//! Three modalities: text and tables come back as snippet strings, images as
//! [`ImageHit`]s pointing at bytes, a file, or a URL. Everything external
//! sits behind object-safe traits so production backends (see [`serper`])
//! and test doubles are interchangeable.

pub mod dispatch;
pub mod serper;

pub use dispatch::{Dispatcher, VisualObservation};
pub use serper::{SerperClient, SerperImageSearch, SerperTextSearch};

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;

use crate::vision::NormalizedImage;

/// Snippet retrieval (text and table modalities): query in, ordered strings out.
#[async_trait]
pub trait SnippetRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> anyhow::Result<Vec<String>>;
}

/// Image retrieval (visual modality): query in, ordered candidates out.
#[async_trait]
pub trait ImageRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> anyhow::Result<Vec<ImageHit>>;
}

/// Where an image's bytes live.
#[derive(Debug, Clone)]
pub enum ImageData {
    Inline(Bytes),
    Path(PathBuf),
    Url(String),
}

/// One candidate from a visual retrieval call.
///
/// `reference` identifies the source (path or URL) and is what the
/// deduplication allowance counts.
#[derive(Debug, Clone)]
pub struct ImageHit {
    pub reference: String,
    pub data: ImageData,
}

impl ImageHit {
    pub fn url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            reference: url.clone(),
            data: ImageData::Url(url),
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            reference: path.to_string_lossy().into_owned(),
            data: ImageData::Path(path),
        }
    }

    pub fn inline(reference: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            reference: reference.into(),
            data: ImageData::Inline(bytes.into()),
        }
    }
}

/// An image the run has retrieved (or cropped), in both coordinate spaces.
///
/// The model sees only the normalized side, so crop coordinates arrive in
/// normalized space and must be remapped against `raw`. Crops carry no
/// `reference`; only search results participate in deduplication.
#[derive(Debug, Clone)]
pub struct RetrievedImage {
    pub raw: DynamicImage,
    pub normalized: NormalizedImage,
    pub reference: Option<String>,
}

/// Everything one run has retrieved so far, per modality. Append-only,
/// never pruned during a run; owned by the loop and threaded through each
/// iteration so concurrent runs cannot interfere.
#[derive(Debug, Clone, Default)]
pub struct RetrievalHistory {
    pub text: Vec<String>,
    pub tables: Vec<String>,
    pub images: Vec<RetrievedImage>,
    used_references: Vec<String>,
}

impl RetrievalHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times this source has already been used in the run.
    pub fn times_used(&self, reference: &str) -> usize {
        self.used_references
            .iter()
            .filter(|used| used.as_str() == reference)
            .count()
    }

    pub fn record_reference(&mut self, reference: String) {
        self.used_references.push(reference);
    }

    /// The image a crop action targets.
    pub fn latest_image(&self) -> Option<&RetrievedImage> {
        self.images.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times_used_counts_repeats() {
        let mut history = RetrievalHistory::new();
        assert_eq!(history.times_used("a.jpg"), 0);
        history.record_reference("a.jpg".to_string());
        history.record_reference("a.jpg".to_string());
        history.record_reference("b.jpg".to_string());
        assert_eq!(history.times_used("a.jpg"), 2);
        assert_eq!(history.times_used("b.jpg"), 1);
    }

    #[test]
    fn hit_constructors_set_reference_from_source() {
        let hit = ImageHit::url("https://example.com/cat.jpg");
        assert_eq!(hit.reference, "https://example.com/cat.jpg");
        let hit = ImageHit::path("/tmp/dog.png");
        assert_eq!(hit.reference, "/tmp/dog.png");
        assert!(matches!(hit.data, ImageData::Path(_)));
    }
}
