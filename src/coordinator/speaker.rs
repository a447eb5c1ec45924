//! Next-speaker selection.

use super::agent::{Agent, TranscriptMessage};
use super::role::RoleRegistry;
use super::stage::{derive_stage, ConversationStage};
use serde::Serialize;

const BELOW_SHARE_BONUS: i32 = 20;
const ABOVE_SHARE_PENALTY: i32 = 10;
const REPEAT_PENALTY: i32 = 15;
const OVER_SHARE_FACTOR: f64 = 1.5;

/// Score breakdown for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeakerScore {
    pub agent_key: String,
    pub participation: i32,
    pub stage_bonus: i32,
    pub repeat_penalty: i32,
}

impl SpeakerScore {
    pub fn total(&self) -> i32 {
        self.participation + self.stage_bonus - self.repeat_penalty
    }
}

/// Score every roster agent against the transcript, in roster order.
pub fn score_candidates(
    roster: &[Agent],
    transcript: &[TranscriptMessage],
    registry: &RoleRegistry,
) -> Vec<SpeakerScore> {
    if roster.is_empty() {
        return Vec::new();
    }
    let stage = derive_stage(transcript.len(), roster.len());
    let expected = transcript.len() as f64 / roster.len() as f64;
    let last = transcript.last().map(|m| m.speaker_key.as_str());

    roster
        .iter()
        .map(|agent| {
            let spoken = transcript.iter().filter(|m| m.speaker_key == agent.key).count() as f64;
            let participation = if spoken < expected {
                BELOW_SHARE_BONUS
            } else if spoken > OVER_SHARE_FACTOR * expected {
                -ABOVE_SHARE_PENALTY
            } else {
                0
            };
            SpeakerScore {
                agent_key: agent.key.clone(),
                participation,
                stage_bonus: registry.stage_bonus(&agent.role, stage),
                repeat_penalty: if last == Some(agent.key.as_str()) { REPEAT_PENALTY } else { 0 },
            }
        })
        .collect()
}

/// Pick the agent who should speak next.
///
/// With an empty transcript the first moderator-role agent opens (or the first agent if
/// the roster has none). Otherwise the highest score wins and ties go to the agent listed
/// first. Deterministic for identical inputs.
pub fn determine_next_speaker<'a>(
    roster: &'a [Agent],
    transcript: &[TranscriptMessage],
    registry: &RoleRegistry,
) -> Option<&'a Agent> {
    if transcript.is_empty() {
        return roster
            .iter()
            .find(|a| registry.is_moderator(&a.role))
            .or_else(|| roster.first());
    }
    let scores = score_candidates(roster, transcript, registry);
    let mut best: Option<(usize, i32)> = None;
    for (idx, score) in scores.iter().enumerate() {
        let total = score.total();
        if best.map_or(true, |(_, top)| total > top) {
            best = Some((idx, total));
        }
    }
    best.map(|(idx, _)| &roster[idx])
}

/// Stage the conversation is in for the given roster.
pub fn current_stage(roster: &[Agent], transcript: &[TranscriptMessage]) -> ConversationStage {
    derive_stage(transcript.len(), roster.len())
}
