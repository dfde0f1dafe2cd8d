//! Agent module - the core think → search → observe loop.
//!
//! One iteration:
//! 1. Ask the model for its next utterance given the transcript
//! 2. Parse out the thought and the single action tag
//! 3. Dispatch the action (retrieval or crop) and fold the observation back
//! 4. Repeat until an `<answer>` tag or step exhaustion
//!
//! Every step surfaces as an event on a bounded channel; the consumer reads
//! one event at a time and may stop reading to cancel the run cooperatively.

mod agent_loop;
mod prompt;

pub use agent_loop::{Agent, RunOutcome};
pub use prompt::{build_question_prompt, ANSWER_NUDGE, EXHAUSTED_ANSWER};
