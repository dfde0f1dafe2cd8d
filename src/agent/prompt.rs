//! Prompt templates and fixed loop messages.

/// Build the initial user prompt carrying the question and the tool protocol.
pub fn build_question_prompt(question: &str) -> String {
    format!(
        r#"You are a multimodal question answering agent for complex tasks. You have access to the following tools:
1. <search_text>query</search_text>: Retrieve relevant text passages, facts, or definitions based on the query.
2. <search_visual>query</search_visual>: Retrieve relevant images or visual diagrams based on the query.
3. <search_table>query</search_table>: Retrieve structured tabular data if needed.
4. <crop>[x1, y1, x2, y2]</crop>: Zoom into the region of the latest image with coordinates for a clearer view.

Reason inside <think>...</think> before every action, then emit exactly one action tag.
When you can answer, output the final answer in <answer>...</answer>.

Question: {question}"#,
        question = question
    )
}

/// Appended to the observation before the final permitted model call, so the
/// last step is steered toward answering instead of another retrieval.
pub const ANSWER_NUDGE: &str =
    "Please answer the question now, with the answer inside <answer>...</answer>.";

/// Fallback answer text emitted when the step budget runs out.
pub const EXHAUSTED_ANSWER: &str =
    "Sorry, I could not retrieve enough information to answer the question.";
