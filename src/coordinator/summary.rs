//! Deterministic transcript summaries.

use super::agent::{Agent, TranscriptMessage};
use super::quality::{default_vocabulary, topic_coverage};
use crate::utils::preview;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const KEY_POINT_MIN_CHARS: usize = 100;
const MAX_KEY_POINTS: usize = 5;
const MAX_DECISIONS: usize = 10;
const MAX_ACTION_ITEMS: usize = 10;
const MAX_FOLLOW_UPS: usize = 5;
const PREVIEW_CHARS: usize = 120;

static SENTENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]+[.!?]*").expect("valid regex"));

static DECISION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(decided|decision|agreed?|conclude[ds]?|approved?|resolved|confirmed)\b")
        .expect("valid regex")
});

static ACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(action items?|follow[- ]up|next steps?|needs? to|must|should|will|assign(ed)?|deadline|request)\b",
    )
    .expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub agent_key: String,
    pub agent_name: String,
    pub messages: usize,
    /// Preview of the agent's most recent message.
    pub latest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub topic: String,
    pub executive_summary: String,
    pub key_points: Vec<String>,
    pub decisions: Vec<String>,
    pub action_items: Vec<String>,
    pub contributions: Vec<Contribution>,
    pub follow_up_topics: Vec<String>,
}

pub(crate) fn sentences(text: &str) -> impl Iterator<Item = &str> {
    SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

/// Summarize a transcript without any model call.
pub fn summarize_transcript(
    topic: &str,
    roster: &[Agent],
    transcript: &[TranscriptMessage],
) -> ConversationSummary {
    let key_points: Vec<String> = transcript
        .iter()
        .filter(|m| m.content.chars().count() > KEY_POINT_MIN_CHARS)
        .filter_map(|m| sentences(&m.content).next().map(str::to_string))
        .take(MAX_KEY_POINTS)
        .collect();

    let mut decisions = Vec::new();
    let mut action_items = Vec::new();
    let mut questions = Vec::new();
    for message in transcript {
        for sentence in sentences(&message.content) {
            if DECISION.is_match(sentence) {
                if decisions.len() < MAX_DECISIONS {
                    decisions.push(sentence.to_string());
                }
            } else if ACTION.is_match(sentence) {
                if action_items.len() < MAX_ACTION_ITEMS {
                    action_items.push(sentence.to_string());
                }
            } else if sentence.ends_with('?') {
                questions.push(preview(sentence, PREVIEW_CHARS));
            }
        }
    }

    let contributions: Vec<Contribution> = roster
        .iter()
        .filter_map(|agent| {
            let spoken: Vec<&TranscriptMessage> =
                transcript.iter().filter(|m| m.speaker_key == agent.key).collect();
            spoken.last().map(|latest| Contribution {
                agent_key: agent.key.clone(),
                agent_name: agent.name.clone(),
                messages: spoken.len(),
                latest: preview(&latest.content, PREVIEW_CHARS),
            })
        })
        .collect();

    let vocabulary = default_vocabulary();
    let covered = topic_coverage(transcript, &vocabulary);
    let follow_up_topics: Vec<String> = questions
        .into_iter()
        .chain(
            vocabulary
                .iter()
                .filter(|t| !covered.contains(t))
                .map(|t| format!("Assess {}", t)),
        )
        .take(MAX_FOLLOW_UPS)
        .collect();

    let executive_summary = if transcript.is_empty() {
        format!("No discussion has taken place on \"{}\" yet.", topic)
    } else {
        let mut text = format!(
            "Discussion of \"{}\" across {} message(s) from {} participant(s).",
            topic,
            transcript.len(),
            contributions.len()
        );
        if !covered.is_empty() {
            text.push_str(&format!(" Topics covered: {}.", covered.join(", ")));
        }
        text.push_str(&format!(
            " {} decision(s) and {} action item(s) recorded.",
            decisions.len(),
            action_items.len()
        ));
        text
    };

    ConversationSummary {
        topic: topic.to_string(),
        executive_summary,
        key_points,
        decisions,
        action_items,
        contributions,
        follow_up_topics,
    }
}

/// Executive summary used when context analysis is unavailable.
pub fn generic_executive_summary(topic: &str, message_count: usize) -> String {
    format!(
        "Summary of the discussion on \"{}\" ({} message(s)). Detailed context was unavailable; review the key points and action items below.",
        topic, message_count
    )
}
