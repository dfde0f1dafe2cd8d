//! # vrag
//!
//! A multi-turn multimodal retrieval QA agent.
//!
//! This library provides:
//! - A think → search → observe loop driving a multimodal model
//! - Retrieval over three modalities (text, images, tables)
//! - Crop-and-zoom on previously retrieved images with coordinate remapping
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Send the question and prior observations to the model
//! 2. Parse the response into a thought and one action tag
//! 3. Dispatch the action to a retrieval collaborator (or crop an image)
//! 4. Feed the observation back to the model, repeat until an answer
//!    or the step budget runs out
//!
//! Every step is surfaced to the consumer as an [`events::AgentEvent`] over a
//! bounded channel, one event at a time.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vrag::{agent::Agent, config::Config};
//!
//! let config = Config::from_env()?;
//! let agent = std::sync::Arc::new(Agent::new(config));
//! let (handle, mut events) = agent.stream("What color is the Eiffel Tower at night?");
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! let outcome = handle.await?;
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod parser;
pub mod retrieval;
pub mod transcript;
pub mod vision;

pub use agent::{Agent, RunOutcome};
pub use config::Config;
pub use error::AgentError;
pub use events::AgentEvent;
