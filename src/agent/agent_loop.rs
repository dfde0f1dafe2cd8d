//! Core agent loop implementation.

use std::sync::Arc;

use image::GenericImageView;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AgentError;
use crate::events::AgentEvent;
use crate::llm::{LlmClient, OpenAiClient};
use crate::parser::{parse_utterance, Action};
use crate::retrieval::{
    Dispatcher, ImageRetriever, RetrievalHistory, RetrievedImage, SerperClient, SerperImageSearch,
    SerperTextSearch, SnippetRetriever,
};
use crate::transcript::{Transcript, Turn};
use crate::vision;

use super::prompt::{build_question_prompt, ANSWER_NUDGE, EXHAUSTED_ANSWER};

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The model produced an `<answer>` tag.
    Answered(String),
    /// The step budget ran out; the consumer received the fallback answer.
    Exhausted,
    /// A structural failure (malformed action, unreachable model) ended the
    /// run early.
    Failed(AgentError),
    /// The consumer dropped the event receiver; the run stopped without
    /// further collaborator calls.
    Abandoned,
}

/// Event channel capacity. One: the producer suspends after every event
/// until the consumer has taken it.
const EVENT_BUFFER: usize = 1;

/// The question-answering agent.
pub struct Agent {
    config: Config,
    llm: Arc<dyn LlmClient>,
    dispatcher: Dispatcher,
}

impl Agent {
    /// Create an agent wired to the production collaborators: an
    /// OpenAI-compatible model endpoint and Serper retrieval backends.
    pub fn new(config: Config) -> Self {
        let serper = Arc::new(SerperClient::new(config.serper_api_key.clone()));
        let llm = Arc::new(OpenAiClient::new(config.model.clone()));
        Self::with_collaborators(
            config,
            llm,
            Arc::new(SerperTextSearch(Arc::clone(&serper))),
            Arc::new(SerperTextSearch(Arc::clone(&serper))),
            Arc::new(SerperImageSearch(serper)),
        )
    }

    /// Create an agent with custom collaborators. Test doubles and
    /// production backends are interchangeable here.
    pub fn with_collaborators(
        config: Config,
        llm: Arc<dyn LlmClient>,
        text: Arc<dyn SnippetRetriever>,
        table: Arc<dyn SnippetRetriever>,
        visual: Arc<dyn ImageRetriever>,
    ) -> Self {
        let dispatcher = Dispatcher::new(text, table, visual, &config);
        Self {
            config,
            llm,
            dispatcher,
        }
    }

    /// Run a question in a background task, streaming events over a bounded
    /// channel. Dropping the receiver cancels the run cooperatively.
    pub fn stream(
        self: &Arc<Self>,
        question: impl Into<String>,
    ) -> (JoinHandle<RunOutcome>, mpsc::Receiver<AgentEvent>) {
        let (events, rx) = mpsc::channel(EVENT_BUFFER);
        let agent = Arc::clone(self);
        let question = question.into();
        let handle = tokio::spawn(async move { agent.run(&question, events).await });
        (handle, rx)
    }

    /// Drive one question to completion and collect the full event sequence.
    pub async fn run_question(&self, question: &str) -> (RunOutcome, Vec<AgentEvent>) {
        let (events, mut rx) = mpsc::channel(EVENT_BUFFER);
        let run = self.run(question, events);
        let drain = async {
            let mut all = Vec::new();
            while let Some(event) = rx.recv().await {
                all.push(event);
            }
            all
        };
        tokio::join!(run, drain)
    }

    /// Drive one question, emitting events as they happen.
    ///
    /// All run state (transcript, retrieval history, budget) lives in this
    /// call, so independent runs of the same agent cannot interfere.
    pub async fn run(&self, question: &str, events: mpsc::Sender<AgentEvent>) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let mut transcript = Transcript::new();
        transcript.push(Turn::user_text(build_question_prompt(question)));
        let mut history = RetrievalHistory::new();
        let mut steps_remaining = self.config.max_steps;

        loop {
            // Budget check precedes the model call: exhaustion preempts any
            // further dispatch, so a run makes at most `max_steps` model
            // calls no matter what the model keeps asking for.
            if steps_remaining == 0 {
                debug!("run {}: step budget exhausted", run_id);
                let _ = events
                    .send(AgentEvent::Answer {
                        text: EXHAUSTED_ANSWER.to_string(),
                        raw: String::new(),
                    })
                    .await;
                return RunOutcome::Exhausted;
            }

            debug!(
                "run {}: step {}/{}",
                run_id,
                self.config.max_steps - steps_remaining + 1,
                self.config.max_steps
            );

            let utterance = match self.llm.complete(&transcript).await {
                Ok(utterance) => utterance,
                Err(error) => {
                    warn!("run {}: model call failed: {:#}", run_id, error);
                    let failure = AgentError::model_unavailable(error);
                    let _ = events
                        .send(AgentEvent::Error {
                            message: failure.to_string(),
                            fatal: true,
                        })
                        .await;
                    return RunOutcome::Failed(failure);
                }
            };
            transcript.push(Turn::assistant_text(&utterance));

            let parsed = parse_utterance(&utterance);
            let sent = events
                .send(AgentEvent::Think {
                    thought: parsed.thought,
                    raw: parsed.thought_fragment,
                })
                .await;
            if sent.is_err() {
                return RunOutcome::Abandoned;
            }

            let raw = parsed.action_fragment;
            let event = match parsed.action {
                Action::Malformed(reason) => {
                    let failure = AgentError::MalformedAction(reason);
                    let _ = events
                        .send(AgentEvent::Error {
                            message: failure.to_string(),
                            fatal: true,
                        })
                        .await;
                    return RunOutcome::Failed(failure);
                }
                Action::Answer(text) => {
                    let _ = events
                        .send(AgentEvent::Answer {
                            text: text.clone(),
                            raw,
                        })
                        .await;
                    return RunOutcome::Answered(text);
                }
                Action::SearchText(query) => {
                    let results = self
                        .dispatcher
                        .search_text(&query, &mut history, &mut transcript)
                        .await;
                    if results.is_empty() {
                        AgentEvent::Error {
                            message: format!("text search returned nothing for: {}", query),
                            fatal: false,
                        }
                    } else {
                        AgentEvent::SearchText {
                            query,
                            results,
                            raw,
                        }
                    }
                }
                Action::SearchTable(query) => {
                    let results = self
                        .dispatcher
                        .search_table(&query, &mut history, &mut transcript)
                        .await;
                    if results.is_empty() {
                        AgentEvent::Error {
                            message: format!("table search returned nothing for: {}", query),
                            fatal: false,
                        }
                    } else {
                        AgentEvent::SearchTable {
                            query,
                            results,
                            raw,
                        }
                    }
                }
                Action::SearchVisual(query) => {
                    match self
                        .dispatcher
                        .search_visual(&query, &mut history, &mut transcript)
                        .await
                    {
                        Ok(observation) => AgentEvent::SearchVisual {
                            query,
                            reference: observation.reference,
                            data_uri: observation.data_uri,
                            raw,
                        },
                        Err(error) => {
                            warn!("run {}: visual search failed: {}", run_id, error);
                            AgentEvent::Error {
                                message: error.to_string(),
                                fatal: false,
                            }
                        }
                    }
                }
                Action::Crop(bbox) => {
                    match self.crop_step(bbox, &mut history, &mut transcript) {
                        Ok((region, data_uri)) => AgentEvent::CropImage {
                            region,
                            data_uri,
                            raw,
                        },
                        Err(error) => {
                            warn!("run {}: crop failed: {}", run_id, error);
                            AgentEvent::Error {
                                message: error.to_string(),
                                fatal: false,
                            }
                        }
                    }
                }
            };

            if events.send(event).await.is_err() {
                return RunOutcome::Abandoned;
            }

            steps_remaining -= 1;
            if steps_remaining == 1 {
                transcript.append_user_text(ANSWER_NUDGE);
            }
        }
    }

    /// Crop the most recent image: remap the model's normalized-space box
    /// into raw space, crop the raw image, and normalize the crop like any
    /// other retrieved image. Nothing is folded on failure.
    fn crop_step(
        &self,
        bbox: [f64; 4],
        history: &mut RetrievalHistory,
        transcript: &mut Transcript,
    ) -> Result<([u32; 4], String), AgentError> {
        let target = history.latest_image().ok_or(AgentError::NoImageToCrop)?;

        let region = vision::remap_bbox(
            bbox,
            target.normalized.dimensions(),
            target.raw.dimensions(),
            self.config.crop_padding,
        )?;
        let crop = vision::crop_raw(&target.raw, &region);
        let normalized = vision::normalize(&crop, self.config.min_pixels, self.config.max_pixels)?;
        let data_uri = normalized.data_uri.clone();

        history.images.push(RetrievedImage {
            raw: crop,
            normalized,
            reference: None,
        });
        transcript.push(Turn::user_image(&data_uri));

        Ok((region.to_pixels(), data_uri))
    }
}
