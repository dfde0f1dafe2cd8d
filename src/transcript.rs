//! Conversation transcript exchanged with the model collaborator.
//!
//! A transcript is an append-only sequence of turns. Each turn carries a role
//! and a list of typed segments, so one user turn can mix text and images,
//! the shape multimodal chat endpoints expect.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One typed piece of turn content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text { text: String },
    /// An embedded image as a `data:image;base64,…` URI.
    Image { data_uri: String },
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Vec<Segment>,
}

impl Turn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![Segment::Text { text: text.into() }],
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![Segment::Text { text: text.into() }],
        }
    }

    pub fn user_image(data_uri: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![Segment::Image {
                data_uri: data_uri.into(),
            }],
        }
    }
}

/// Ordered, append-only conversation history for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Append a text segment to the last turn, or start a new user turn if
    /// the transcript is empty or ends with an assistant turn.
    pub fn append_user_text(&mut self, text: impl Into<String>) {
        match self.turns.last_mut() {
            Some(turn) if turn.role == Role::User => {
                turn.content.push(Segment::Text { text: text.into() });
            }
            _ => self.push(Turn::user_text(text)),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_preserve_order() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user_text("question"));
        transcript.push(Turn::assistant_text("<think>hm</think><answer>42</answer>"));
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[0].role, Role::User);
        assert_eq!(transcript.turns()[1].role, Role::Assistant);
    }

    #[test]
    fn append_user_text_extends_trailing_user_turn() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user_image("data:image;base64,AAAA"));
        transcript.append_user_text("please answer now");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.turns()[0].content.len(), 2);
    }

    #[test]
    fn append_user_text_starts_turn_after_assistant() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::assistant_text("thinking..."));
        transcript.append_user_text("observation");
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[1].role, Role::User);
    }

    #[test]
    fn segments_serialize_with_type_tag() {
        let segment = Segment::Text {
            text: "hi".to_string(),
        };
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["type"], "text");
    }
}
