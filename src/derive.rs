//! Title and preview derivation
//!
//! Both come from the first user message. Truncation counts characters,
//! not bytes, so multi-byte text is never split mid-codepoint.

use crate::storage::types::{ChatMessage, Role};

/// Preview used when a conversation has no user message
pub const EMPTY_PREVIEW: &str = "Empty conversation";

/// Title used when a conversation has no usable user message
pub const DEFAULT_TITLE: &str = "New conversation";

/// Default preview length in characters
pub const DEFAULT_PREVIEW_CHARS: usize = 80;

/// Default title length in characters
pub const DEFAULT_TITLE_CHARS: usize = 50;

fn first_user_message(messages: &[ChatMessage]) -> Option<&ChatMessage> {
    messages.iter().find(|m| m.role == Role::User)
}

/// First `max_chars` characters of the first user message
///
/// Returns [`EMPTY_PREVIEW`] when no message has the user role.
///
/// # Examples
///
/// ```
/// use chatkeep::derive::preview_from_messages;
/// use chatkeep::storage::{ChatMessage, Role};
///
/// let messages = vec![
///     ChatMessage::new("a", Role::Assistant, "hi", 0),
///     ChatMessage::new("b", Role::User, "Hello world, please help me today", 1),
/// ];
/// assert_eq!(preview_from_messages(&messages, 80), "Hello world, please help me today");
/// ```
pub fn preview_from_messages(messages: &[ChatMessage], max_chars: usize) -> String {
    match first_user_message(messages) {
        Some(message) => message.content.chars().take(max_chars).collect(),
        None => EMPTY_PREVIEW.to_string(),
    }
}

/// Short title from the first line of the first user message
///
/// Longer lines are cut to `max_chars - 3` characters followed by `...`.
/// Falls back to [`DEFAULT_TITLE`] when there is nothing to use.
pub fn title_from_messages(messages: &[ChatMessage], max_chars: usize) -> String {
    let line = first_user_message(messages)
        .and_then(|m| m.content.lines().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or("");

    if line.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    if line.chars().count() <= max_chars {
        return line.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let mut title: String = line.chars().take(keep).collect();
    title.push_str("...");
    title
}
