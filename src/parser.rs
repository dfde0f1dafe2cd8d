//! Utterance parsing: thought span + one structured action.
//!
//! The model replies in free-form text carrying at most one action tag
//! (`<search_text>…</search_text>`, `<crop>[x1,y1,x2,y2]</crop>`, …) and,
//! by convention, its reasoning before the tag or inside `<think>…</think>`.
//! Nothing guarantees the output is well-formed, so parsing never fails;
//! anything unrecognizable collapses into [`Action::Malformed`] and the loop
//! decides what to do with it. All tolerance policy lives here.

/// Closing end-of-thought delimiter.
const END_OF_THOUGHT: &str = "</think>";

/// Opening end-of-thought delimiter, stripped from extracted thoughts.
const START_OF_THOUGHT: &str = "<think>";

/// Recognized action tags, `bbox` being the legacy alias for `crop`.
const ACTION_TAGS: [&str; 6] = [
    "search_text",
    "search_visual",
    "search_table",
    "crop",
    "bbox",
    "answer",
];

/// A structured tool invocation parsed out of a model utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SearchText(String),
    SearchVisual(String),
    SearchTable(String),
    /// Bounding box `[x1, y1, x2, y2]` in normalized-image pixels.
    Crop([f64; 4]),
    Answer(String),
    /// No recognized, well-formed action tag; carries the diagnostic.
    Malformed(String),
}

/// The result of parsing one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUtterance {
    /// Explanatory text preceding the action.
    pub thought: String,
    /// Raw utterance fragment the thought came from.
    pub thought_fragment: String,
    pub action: Action,
    /// Raw `<tag>…</tag>` span, empty when no well-formed span was found.
    pub action_fragment: String,
}

/// Extract the thought span and at most one action from a raw utterance.
pub fn parse_utterance(utterance: &str) -> ParsedUtterance {
    let first_tag = find_first_action_tag(utterance);

    // Thought boundary: the closing think delimiter wins; otherwise
    // everything before the first action tag; otherwise the whole utterance.
    let (thought, thought_fragment) = match utterance.find(END_OF_THOUGHT) {
        Some(end) => {
            let inner = utterance[..end]
                .trim_start()
                .strip_prefix(START_OF_THOUGHT)
                .unwrap_or(&utterance[..end]);
            (
                inner.trim().to_string(),
                utterance[..end + END_OF_THOUGHT.len()].to_string(),
            )
        }
        None => {
            let cut = first_tag.map(|(pos, _)| pos).unwrap_or(utterance.len());
            let thought = utterance[..cut].trim().to_string();
            (thought.clone(), thought)
        }
    };

    let (action, action_fragment) = match first_tag {
        Some((pos, tag)) => extract_action(utterance, pos, tag),
        None => (
            Action::Malformed("no recognized action tag".to_string()),
            String::new(),
        ),
    };

    ParsedUtterance {
        thought,
        thought_fragment,
        action,
        action_fragment,
    }
}

/// Position and name of the earliest recognized opening tag. First tag wins;
/// any further action tags in the utterance are ignored.
fn find_first_action_tag(utterance: &str) -> Option<(usize, &'static str)> {
    ACTION_TAGS
        .iter()
        .filter_map(|tag| {
            utterance
                .find(&format!("<{}>", tag))
                .map(|pos| (pos, *tag))
        })
        .min_by_key(|(pos, _)| *pos)
}

fn extract_action(utterance: &str, open_at: usize, tag: &'static str) -> (Action, String) {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let content_start = open_at + open.len();

    let Some(rel_close) = utterance[content_start..].find(&close) else {
        return (
            Action::Malformed(format!("unterminated <{}> span", tag)),
            String::new(),
        );
    };

    let content = utterance[content_start..content_start + rel_close].trim();
    let fragment = utterance[open_at..content_start + rel_close + close.len()].to_string();

    let action = match tag {
        "search_text" => Action::SearchText(content.to_string()),
        "search_visual" => Action::SearchVisual(content.to_string()),
        "search_table" => Action::SearchTable(content.to_string()),
        "crop" | "bbox" => parse_crop_coordinates(content),
        "answer" => Action::Answer(content.to_string()),
        _ => unreachable!("tag comes from ACTION_TAGS"),
    };

    (action, fragment)
}

/// The crop payload is a JSON array of exactly four numbers.
fn parse_crop_coordinates(content: &str) -> Action {
    match serde_json::from_str::<Vec<f64>>(content) {
        Ok(coords) if coords.len() == 4 => Action::Crop([coords[0], coords[1], coords[2], coords[3]]),
        _ => Action::Malformed(format!(
            "crop coordinates must be a JSON array of four numbers, got: {}",
            content
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_text_with_cjk_content() {
        let parsed = parse_utterance("<search_text>苹果</search_text>");
        assert_eq!(parsed.action, Action::SearchText("苹果".to_string()));
        assert_eq!(parsed.action_fragment, "<search_text>苹果</search_text>");
    }

    #[test]
    fn unterminated_tag_is_malformed_not_a_panic() {
        let parsed = parse_utterance("<search_text>苹果");
        assert!(matches!(parsed.action, Action::Malformed(_)));
        assert!(parsed.action_fragment.is_empty());
    }

    #[test]
    fn no_tag_means_whole_utterance_is_thought() {
        let parsed = parse_utterance("I am not sure what to do here.");
        assert_eq!(parsed.thought, "I am not sure what to do here.");
        assert!(matches!(parsed.action, Action::Malformed(_)));
    }

    #[test]
    fn thought_comes_from_think_span() {
        let parsed =
            parse_utterance("<think>need a picture first</think><search_visual>big ben</search_visual>");
        assert_eq!(parsed.thought, "need a picture first");
        assert_eq!(
            parsed.thought_fragment,
            "<think>need a picture first</think>"
        );
        assert_eq!(parsed.action, Action::SearchVisual("big ben".to_string()));
    }

    #[test]
    fn missing_think_delimiter_falls_back_to_text_before_tag() {
        let parsed = parse_utterance("Let me look this up first. <search_text>tourism revenue</search_text>");
        assert_eq!(parsed.thought, "Let me look this up first.");
        assert_eq!(
            parsed.action,
            Action::SearchText("tourism revenue".to_string())
        );
    }

    #[test]
    fn first_action_tag_wins() {
        let parsed = parse_utterance(
            "<search_table>cats</search_table><search_text>dogs</search_text>",
        );
        assert_eq!(parsed.action, Action::SearchTable("cats".to_string()));
    }

    #[test]
    fn crop_coordinates_parse_as_json_array() {
        let parsed = parse_utterance("zooming in <crop>[10, 20, 110.5, 220]</crop>");
        assert_eq!(parsed.action, Action::Crop([10.0, 20.0, 110.5, 220.0]));
    }

    #[test]
    fn bbox_is_an_alias_for_crop() {
        let parsed = parse_utterance("<bbox>[1, 2, 3, 4]</bbox>");
        assert_eq!(parsed.action, Action::Crop([1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn non_numeric_crop_payload_is_malformed() {
        let parsed = parse_utterance("<crop>the top left corner</crop>");
        assert!(matches!(parsed.action, Action::Malformed(_)));
    }

    #[test]
    fn wrong_arity_crop_payload_is_malformed() {
        let parsed = parse_utterance("<crop>[1, 2, 3]</crop>");
        assert!(matches!(parsed.action, Action::Malformed(_)));
    }

    #[test]
    fn unrecognized_tag_is_not_an_action() {
        let parsed = parse_utterance("<text_rewrite>say it nicer</text_rewrite>");
        assert!(matches!(parsed.action, Action::Malformed(_)));
        assert_eq!(parsed.thought, "<text_rewrite>say it nicer</text_rewrite>");
    }

    #[test]
    fn answer_content_is_trimmed() {
        let parsed = parse_utterance("<think>done</think><answer>  Paris  </answer>");
        assert_eq!(parsed.action, Action::Answer("Paris".to_string()));
    }

    #[test]
    fn think_without_opener_still_bounds_the_thought() {
        let parsed = parse_utterance("reasoning out loud</think><answer>42</answer>");
        assert_eq!(parsed.thought, "reasoning out loud");
        assert_eq!(parsed.action, Action::Answer("42".to_string()));
    }
}
