//! Model collaborator interface.
//!
//! The loop only needs one capability from the model: given the transcript so
//! far, produce the next utterance. Production backends and test doubles both
//! implement [`LlmClient`].

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;

use crate::transcript::Transcript;

/// A multimodal chat model reachable as "transcript in, utterance out".
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Produce the next assistant utterance for the given transcript.
    ///
    /// A failure here is structural: the loop halts the run rather than
    /// retrying transparently.
    async fn complete(&self, transcript: &Transcript) -> anyhow::Result<String>;
}
