//! Retrieval dispatch: route a search action to its collaborator and fold
//! the results into the run's history and transcript.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AgentError;
use crate::transcript::{Transcript, Turn};
use crate::vision;

use super::{
    ImageData, ImageHit, ImageRetriever, RetrievalHistory, RetrievedImage, SnippetRetriever,
};

/// What a successful visual dispatch hands back for the event stream.
#[derive(Debug, Clone)]
pub struct VisualObservation {
    pub reference: String,
    pub data_uri: String,
}

/// Routes search actions to the retrieval collaborators.
pub struct Dispatcher {
    text: Arc<dyn SnippetRetriever>,
    table: Arc<dyn SnippetRetriever>,
    visual: Arc<dyn ImageRetriever>,
    http: reqwest::Client,
    min_pixels: u32,
    max_pixels: u32,
    repeat_allowance: usize,
}

impl Dispatcher {
    pub fn new(
        text: Arc<dyn SnippetRetriever>,
        table: Arc<dyn SnippetRetriever>,
        visual: Arc<dyn ImageRetriever>,
        config: &Config,
    ) -> Self {
        Self {
            text,
            table,
            visual,
            http: reqwest::Client::new(),
            min_pixels: config.min_pixels,
            max_pixels: config.max_pixels,
            repeat_allowance: config.repeated_nums,
        }
    }

    /// Text retrieval. On success the results join into one text observation
    /// turn. An unreachable collaborator degrades to an empty list; the
    /// caller treats empty as a per-step failure.
    pub async fn search_text(
        &self,
        query: &str,
        history: &mut RetrievalHistory,
        transcript: &mut Transcript,
    ) -> Vec<String> {
        let results = Self::snippets(self.text.as_ref(), "text search", query).await;
        if !results.is_empty() {
            history.text.extend(results.iter().cloned());
            transcript.push(Turn::user_text(results.join("\n")));
        }
        results
    }

    /// Table retrieval; same folding as text, into the table history.
    pub async fn search_table(
        &self,
        query: &str,
        history: &mut RetrievalHistory,
        transcript: &mut Transcript,
    ) -> Vec<String> {
        let results = Self::snippets(self.table.as_ref(), "table search", query).await;
        if !results.is_empty() {
            history.tables.extend(results.iter().cloned());
            transcript.push(Turn::user_text(results.join("\n")));
        }
        results
    }

    async fn snippets(
        retriever: &dyn SnippetRetriever,
        collaborator: &'static str,
        query: &str,
    ) -> Vec<String> {
        match retriever.retrieve(query).await {
            Ok(results) => results,
            Err(error) => {
                warn!("{} failed for {:?}: {:#}", collaborator, query, error);
                Vec::new()
            }
        }
    }

    /// Visual retrieval: pick a candidate under the repetition allowance,
    /// fetch and decode it, normalize it into the model's pixel band, and
    /// fold both spaces into the image history.
    pub async fn search_visual(
        &self,
        query: &str,
        history: &mut RetrievalHistory,
        transcript: &mut Transcript,
    ) -> Result<VisualObservation, AgentError> {
        let candidates = self.visual.retrieve(query).await.map_err(|source| {
            AgentError::CollaboratorUnavailable {
                collaborator: "visual search",
                source,
            }
        })?;

        let hit = self
            .pick_candidate(&candidates, history)
            .ok_or_else(|| AgentError::CollaboratorUnavailable {
                collaborator: "visual search",
                source: anyhow::anyhow!("no image results for query: {}", query),
            })?;

        let bytes = self.fetch(&hit.data).await.map_err(|source| {
            AgentError::CollaboratorUnavailable {
                collaborator: "image fetch",
                source,
            }
        })?;

        let raw = vision::decode(&bytes)?;
        let normalized = vision::normalize(&raw, self.min_pixels, self.max_pixels)?;
        let data_uri = normalized.data_uri.clone();

        history.record_reference(hit.reference.clone());
        history.images.push(RetrievedImage {
            raw,
            normalized,
            reference: Some(hit.reference.clone()),
        });
        transcript.push(Turn::user_image(&data_uri));

        Ok(VisualObservation {
            reference: hit.reference.clone(),
            data_uri,
        })
    }

    /// First candidate still under the repetition allowance; when every
    /// candidate is over it, fall back to the first rather than failing the
    /// step (this can reintroduce a duplicate).
    fn pick_candidate<'a>(
        &self,
        candidates: &'a [ImageHit],
        history: &RetrievalHistory,
    ) -> Option<&'a ImageHit> {
        let fresh = candidates
            .iter()
            .find(|hit| history.times_used(&hit.reference) < self.repeat_allowance);

        match fresh {
            Some(hit) => Some(hit),
            None => {
                let first = candidates.first();
                if let Some(hit) = first {
                    debug!(
                        "all {} visual candidates over the repetition allowance, reusing {}",
                        candidates.len(),
                        hit.reference
                    );
                }
                first
            }
        }
    }

    async fn fetch(&self, data: &ImageData) -> anyhow::Result<Bytes> {
        match data {
            ImageData::Inline(bytes) => Ok(bytes.clone()),
            ImageData::Path(path) => Ok(tokio::fs::read(path).await?.into()),
            ImageData::Url(url) => Ok(self
                .http
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?),
        }
    }
}
