//! Error taxonomy for the agent loop.
//!
//! Two tiers: [`crate::vision::VisionError`] covers per-image failures
//! (decode, degenerate crop regions) and is wrapped here, while the variants
//! below cover the loop-level failures. Per-step failures are reported as
//! non-fatal `error` events and the run continues; structural failures
//! (malformed action, unreachable model) terminate the run.

use thiserror::Error;

use crate::vision::VisionError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Image decode/normalize/crop failure. Per-step: the run continues.
    #[error(transparent)]
    Vision(#[from] VisionError),

    /// The model utterance carried no recognized, well-formed action tag.
    /// Structural: the run finishes as `Failed`.
    #[error("no recognized action in model output: {0}")]
    MalformedAction(String),

    /// An external collaborator (model endpoint or retrieval backend)
    /// could not be reached or returned garbage.
    #[error("{collaborator} collaborator unavailable: {source}")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A crop was requested before any visual retrieval. Per-step.
    #[error("crop requested but no image has been retrieved yet")]
    NoImageToCrop,
}

impl AgentError {
    pub(crate) fn model_unavailable(source: anyhow::Error) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: "model",
            source,
        }
    }

    /// Whether this error terminates the run (versus a per-step failure the
    /// loop survives with a decremented budget).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MalformedAction(_)
                | Self::CollaboratorUnavailable {
                    collaborator: "model",
                    ..
                }
        )
    }
}
