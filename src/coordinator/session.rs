//! Conversation state and sessions.

use super::agent::{Agent, TranscriptMessage};
use super::quality::{analyze_quality, default_vocabulary};
use super::role::RoleRegistry;
use super::speaker::determine_next_speaker;
use super::stage::{derive_stage, ConversationStage};
use crate::error::ErrorContext;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const FOCUS_WINDOW: usize = 5;

/// Snapshot of a conversation, recomputed from the full transcript on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationState {
    /// Speaker of the latest message.
    pub current_speaker: Option<String>,
    pub topic_focus: String,
    pub stage: ConversationStage,
    pub participation: BTreeMap<String, usize>,
    pub quality_score: u32,
    pub message_count: usize,
}

impl ConversationState {
    pub fn derive(
        roster: &[Agent],
        transcript: &[TranscriptMessage],
        topic: &str,
        registry: &RoleRegistry,
    ) -> Self {
        let vocabulary = default_vocabulary();
        let mut participation: BTreeMap<String, usize> =
            roster.iter().map(|a| (a.key.clone(), 0)).collect();
        for message in transcript {
            *participation.entry(message.speaker_key.clone()).or_default() += 1;
        }
        Self {
            current_speaker: transcript.last().map(|m| m.speaker_key.clone()),
            topic_focus: topic_focus(transcript, &vocabulary).unwrap_or_else(|| topic.to_string()),
            stage: derive_stage(transcript.len(), roster.len()),
            participation,
            quality_score: analyze_quality(roster, transcript, &vocabulary, registry).score,
            message_count: transcript.len(),
        }
    }
}

/// Most mentioned vocabulary term over the latest messages. Ties go to the earlier term.
fn topic_focus(transcript: &[TranscriptMessage], vocabulary: &[String]) -> Option<String> {
    let start = transcript.len().saturating_sub(FOCUS_WINDOW);
    let recent: Vec<String> = transcript[start..].iter().map(|m| m.content.to_lowercase()).collect();
    let mut best: Option<(&String, usize)> = None;
    for term in vocabulary {
        let needle = term.to_lowercase();
        let hits: usize = recent.iter().map(|text| text.matches(needle.as_str()).count()).sum();
        if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
            best = Some((term, hits));
        }
    }
    best.map(|(term, _)| term.clone())
}

/// A running conversation: a fixed roster and an append-only transcript.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    topic: String,
    roster: Vec<Agent>,
    transcript: Vec<TranscriptMessage>,
    registry: Arc<RoleRegistry>,
}

impl ConversationSession {
    pub fn new(topic: impl Into<String>, roster: Vec<Agent>, registry: Arc<RoleRegistry>) -> Self {
        Self {
            topic: topic.into(),
            roster,
            transcript: Vec::new(),
            registry,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn roster(&self) -> &[Agent] {
        &self.roster
    }

    pub fn transcript(&self) -> &[TranscriptMessage] {
        &self.transcript
    }

    /// Append a message from a roster agent.
    pub fn post(&mut self, agent_key: &str, content: impl Into<String>) -> Result<&TranscriptMessage> {
        let agent = self.roster.iter().find(|a| a.key == agent_key).ok_or_else(|| {
            Error::validation_with_context(
                format!("agent '{}' is not part of this session", agent_key),
                ErrorContext::new()
                    .with_field_path("speaker_key")
                    .with_component("conversation_session"),
            )
        })?;
        let message = TranscriptMessage::from_agent(agent, content, self.transcript.len());
        Ok(self.push(message))
    }

    /// Append a message from a participant outside the roster, such as the auditor.
    pub fn post_user(
        &mut self,
        speaker_key: impl Into<String>,
        speaker_name: impl Into<String>,
        content: impl Into<String>,
    ) -> &TranscriptMessage {
        let message = TranscriptMessage::new(speaker_key, speaker_name, content, self.transcript.len());
        self.push(message)
    }

    fn push(&mut self, message: TranscriptMessage) -> &TranscriptMessage {
        tracing::debug!(
            topic = %self.topic,
            speaker = %message.speaker_key,
            sequence = message.sequence,
            "transcript message appended"
        );
        self.transcript.push(message);
        &self.transcript[self.transcript.len() - 1]
    }

    pub fn next_speaker(&self) -> Option<&Agent> {
        determine_next_speaker(&self.roster, &self.transcript, &self.registry)
    }

    pub fn state(&self) -> ConversationState {
        ConversationState::derive(&self.roster, &self.transcript, &self.topic, &self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::role;

    fn session() -> ConversationSession {
        ConversationSession::new(
            "Inventory count",
            vec![
                Agent::new("mod", "Moderator", role::MODERATOR),
                Agent::new("fin", "Finance", role::FINANCIAL_EXPERT),
            ],
            Arc::new(RoleRegistry::default()),
        )
    }

    #[test]
    fn test_fresh_session_state() {
        let s = session();
        let state = s.state();
        assert_eq!(state.stage, ConversationStage::Opening);
        assert_eq!(state.current_speaker, None);
        assert_eq!(state.topic_focus, "Inventory count");
        assert_eq!(state.participation.get("fin"), Some(&0));
        assert_eq!(state.quality_score, 0);
        assert_eq!(s.next_speaker().unwrap().key, "mod");
    }

    #[test]
    fn test_post_assigns_sequence_and_updates_state() {
        let mut s = session();
        s.post("mod", "Let us review the fraud risk in inventory.").unwrap();
        s.post_user("user", "Auditor", "Fraud risk seems elevated; what evidence do we have?");
        let last = s.post("fin", "Evidence is limited.").unwrap();
        assert_eq!(last.sequence, 2);

        let state = s.state();
        assert_eq!(state.current_speaker.as_deref(), Some("fin"));
        assert_eq!(state.message_count, 3);
        assert_eq!(state.participation.get("user"), Some(&1));
        // "risk", "fraud" and "evidence" tie; "risk" comes first in the vocabulary
        assert_eq!(state.topic_focus, "risk");
        assert!(state.quality_score > 0);
    }

    #[test]
    fn test_post_rejects_unknown_agent() {
        let mut s = session();
        assert!(matches!(s.post("ghost", "hello"), Err(Error::Validation { .. })));
        assert!(s.transcript().is_empty());
    }

    #[test]
    fn test_stage_never_regresses_through_session() {
        let mut s = session();
        let mut previous = s.state().stage;
        for i in 0..12 {
            let key = if i % 2 == 0 { "mod" } else { "fin" };
            s.post(key, "noted").unwrap();
            let stage = s.state().stage;
            assert!(stage >= previous);
            previous = stage;
        }
        assert_eq!(previous, ConversationStage::Conclusion);
    }
}
