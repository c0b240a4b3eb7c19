use std::collections::HashSet;

/// How a raw reply from the user is read while a plan awaits
/// confirmation. Every input falls into exactly one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Confirm,
    Cancel,
    Unrecognized,
}

const DEFAULT_CONFIRM_PHRASES: &[&str] = &[
    "yes",
    "confirm",
    "correct",
    "okay",
    "ok",
    "sure",
    "go ahead",
    "do it",
    "proceed",
    "create it",
    "update it",
    "delete it",
    "absolutely",
    "definitely",
    "that's right",
    "sounds good",
    "perfect",
    "alright",
    "fine",
    "execute",
    "go for it",
];

const DEFAULT_CANCEL_PHRASES: &[&str] = &[
    "no",
    "cancel",
    "stop",
    "don't",
    "never mind",
    "nevermind",
    "forget it",
    "abort",
];

pub fn default_confirm_phrases() -> Vec<String> {
    DEFAULT_CONFIRM_PHRASES.iter().map(|s| s.to_string()).collect()
}

pub fn default_cancel_phrases() -> Vec<String> {
    DEFAULT_CANCEL_PHRASES.iter().map(|s| s.to_string()).collect()
}

/// Recognized confirmation and cancellation phrases, kept as plain
/// configurable sets so the state machine's transition function stays
/// pure and testable independent of language nuance.
#[derive(Debug, Clone)]
pub struct ConfirmationVocabulary {
    confirm: HashSet<String>,
    cancel: HashSet<String>,
}

impl Default for ConfirmationVocabulary {
    fn default() -> Self {
        Self::with_phrases(
            DEFAULT_CONFIRM_PHRASES.iter().map(|s| s.to_string()),
            DEFAULT_CANCEL_PHRASES.iter().map(|s| s.to_string()),
        )
    }
}

impl ConfirmationVocabulary {
    pub fn with_phrases(
        confirm: impl IntoIterator<Item = String>,
        cancel: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            confirm: confirm.into_iter().map(|p| normalize(&p)).collect(),
            cancel: cancel.into_iter().map(|p| normalize(&p)).collect(),
        }
    }

    /// Case-insensitive membership on the trimmed input. Cancellation
    /// wins on the (misconfigured) chance a phrase appears in both sets.
    pub fn classify(&self, text: &str) -> ReplyKind {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return ReplyKind::Unrecognized;
        }
        if self.cancel.contains(&normalized) {
            return ReplyKind::Cancel;
        }
        if self.confirm.contains(&normalized) {
            return ReplyKind::Confirm;
        }
        ReplyKind::Unrecognized
    }
}

fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '!'])
        .trim()
        .to_lowercase()
}
