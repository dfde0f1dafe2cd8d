//! Consumer-facing execution events.
//!
//! One run produces a finite, strictly ordered sequence of events on a
//! bounded channel. Exactly one terminal event closes the sequence: an
//! `answer`, or an `error` with `fatal` set. Non-fatal errors are advisory:
//! safe to display while continuing to read.
//!
//! Every event carries the raw utterance fragment that produced it, so a
//! presentation layer can show the model's own wording alongside the parsed
//! payload.

use serde::Serialize;

/// Events emitted by the agent loop, in chronological order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// The model's free-form reasoning preceding an action.
    Think { thought: String, raw: String },
    /// Text retrieval completed.
    SearchText {
        query: String,
        results: Vec<String>,
        raw: String,
    },
    /// Visual retrieval completed; `data_uri` is the normalized image as fed
    /// to the model, `reference` the source it was fetched from.
    SearchVisual {
        query: String,
        reference: String,
        data_uri: String,
        raw: String,
    },
    /// Table retrieval completed.
    SearchTable {
        query: String,
        results: Vec<String>,
        raw: String,
    },
    /// A region of the latest image was cropped and re-normalized.
    /// `region` is the clamped box in raw-image pixels.
    CropImage {
        region: [u32; 4],
        data_uri: String,
        raw: String,
    },
    /// Final answer. Terminal. Budget exhaustion also ends the run with this
    /// event, carrying a fixed could-not-complete message.
    Answer { text: String, raw: String },
    /// Something went wrong. Terminal only when `fatal` is set.
    Error { message: String, fatal: bool },
}

impl AgentEvent {
    /// Tag string matching the serialized `type` field.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Think { .. } => "think",
            Self::SearchText { .. } => "search_text",
            Self::SearchVisual { .. } => "search_visual",
            Self::SearchTable { .. } => "search_table",
            Self::CropImage { .. } => "crop_image",
            Self::Answer { .. } => "answer",
            Self::Error { .. } => "error",
        }
    }

    /// Whether the consumer should stop reading after this event.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Answer { .. } | Self::Error { fatal: true, .. }
        )
    }
}
