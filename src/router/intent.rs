//! Routing vocabulary: intents, decisions, conversation states, affirmations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the user wants from a turn, as judged by the router model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Literal data retrieval; the data agent answers.
    Data,
    /// Explanation or analysis; the reasoning agent answers.
    Reasoning,
    /// Gather facts with the data agent, then let the reasoning agent synthesize.
    DataThenReasoning,
}

impl Intent {
    /// Parse the router model's one-word verdict.
    ///
    /// Tolerates punctuation, casing, and extra words. Anything
    /// unrecognised is treated as [`Intent::Reasoning`].
    pub fn parse(verdict: &str) -> Self {
        let lowered = verdict.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        if words.contains(&"both") {
            return Intent::DataThenReasoning;
        }
        for word in &words {
            match *word {
                "data" | "github" | "retrieval" => return Intent::Data,
                "reasoning" | "reason" => return Intent::Reasoning,
                _ => {}
            }
        }
        Intent::Reasoning
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Data => write!(f, "data"),
            Intent::Reasoning => write!(f, "reasoning"),
            Intent::DataThenReasoning => write!(f, "data+reasoning"),
        }
    }
}

/// The router's choice for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Dispatch(Intent),
    /// Reply with this question; no agent runs.
    Clarify(String),
    /// Re-run the pending follow-up verbatim through the bridge.
    ExecuteProposed(String),
}

/// Where a conversation stands between turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    NoRepoContext,
    RepoEstablished,
    AwaitingClarification,
    ExecutingProposedAction,
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversationState::NoRepoContext => "no repository",
            ConversationState::RepoEstablished => "repository established",
            ConversationState::AwaitingClarification => "awaiting clarification",
            ConversationState::ExecutingProposedAction => "executing proposed action",
        };
        write!(f, "{}", s)
    }
}

/// How a reply relates to a pending proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affirmation {
    /// A bare "yes" and its variants.
    Affirmative,
    /// Hedged, conditional, or mixed; needs a clarifying question.
    Ambiguous,
    /// Anything else, including refusals and new requests.
    Other,
}

const LEADS: &[&str] = &[
    "yes", "y", "yeah", "yea", "yep", "yup", "sure", "ok", "okay", "k", "alright",
    "absolutely", "definitely", "proceed", "continue", "go", "do", "please", "lets", "let's",
    "of", "sounds", "fine", "perfect", "cool", "great",
];

const FILLER: &[&str] = &[
    "ahead", "it", "that", "this", "one", "course", "good", "thanks", "thank", "you", "with",
    "me", "right", "please", "go", "do", "sure", "yes", "ok", "okay", "then", "on",
];

const HEDGES: &[&str] = &[
    "maybe", "perhaps", "possibly", "probably", "guess", "unsure", "hmm", "dunno", "idk",
];

const NEGATIONS: &[&str] = &[
    "no", "nope", "nah", "not", "don't", "dont", "stop", "cancel", "never", "wait",
];

const CONDITIONALS: &[&str] = &[
    "but", "or", "instead", "only", "except", "what", "which", "why", "how",
];

/// Classify a reply to a proposed follow-up.
pub fn classify_affirmation(message: &str) -> Affirmation {
    let lowered = message.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .collect();

    let Some(first) = words.first() else {
        return Affirmation::Other;
    };

    let any_of = |set: &[&str]| words.iter().any(|w| set.contains(w));
    let hedged = any_of(HEDGES) || lowered.contains("not sure");
    let questioned = lowered.trim_end().ends_with('?');

    if LEADS.contains(first) {
        if hedged || any_of(NEGATIONS) || any_of(CONDITIONALS) || questioned {
            return Affirmation::Ambiguous;
        }
        if words.iter().all(|w| LEADS.contains(w) || FILLER.contains(w)) {
            return Affirmation::Affirmative;
        }
        return Affirmation::Other;
    }

    if hedged && words.len() <= 4 {
        return Affirmation::Ambiguous;
    }
    Affirmation::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_parse() {
        assert_eq!(Intent::parse("data"), Intent::Data);
        assert_eq!(Intent::parse("Data."), Intent::Data);
        assert_eq!(Intent::parse("reasoning"), Intent::Reasoning);
        assert_eq!(Intent::parse("BOTH"), Intent::DataThenReasoning);
        assert_eq!(Intent::parse("Route to: GitHub Agent"), Intent::Data);
        assert_eq!(Intent::parse("I cannot decide"), Intent::Reasoning);
        assert_eq!(Intent::parse(""), Intent::Reasoning);
    }

    #[test]
    fn test_affirmative_replies() {
        for reply in [
            "yes", "Yes!", "sure", "ok", "okay.", "yes please", "go ahead", "sure, go ahead",
            "do it", "yep", "sounds good", "of course", "please do", "let's do it",
        ] {
            assert_eq!(classify_affirmation(reply), Affirmation::Affirmative, "{}", reply);
        }
    }

    #[test]
    fn test_ambiguous_replies() {
        for reply in [
            "maybe",
            "I guess",
            "yes but only python files",
            "sure, or maybe the tests instead",
            "ok?",
            "hmm, not sure",
            "yes no",
        ] {
            assert_eq!(classify_affirmation(reply), Affirmation::Ambiguous, "{}", reply);
        }
    }

    #[test]
    fn test_other_replies() {
        for reply in [
            "",
            "no",
            "nope, thanks",
            "please list the open pull requests",
            "Explain the scheduler module",
            "ok now summarize the README",
        ] {
            assert_eq!(classify_affirmation(reply), Affirmation::Other, "{}", reply);
        }
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&ConversationState::AwaitingClarification).unwrap();
        assert_eq!(json, "\"awaiting_clarification\"");
        assert_eq!(ConversationState::default(), ConversationState::NoRepoContext);
    }
}
