//! Conversation stages.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    Opening,
    Exploration,
    Analysis,
    Synthesis,
    Conclusion,
}

impl ConversationStage {
    pub const ALL: [ConversationStage; 5] = [
        ConversationStage::Opening,
        ConversationStage::Exploration,
        ConversationStage::Analysis,
        ConversationStage::Synthesis,
        ConversationStage::Conclusion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStage::Opening => "opening",
            ConversationStage::Exploration => "exploration",
            ConversationStage::Analysis => "analysis",
            ConversationStage::Synthesis => "synthesis",
            ConversationStage::Conclusion => "conclusion",
        }
    }
}

impl fmt::Display for ConversationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage boundaries in quarter-rounds: one round is one message per agent.
const BOUNDARIES_IN_QUARTERS: [(usize, ConversationStage); 4] = [
    (4, ConversationStage::Opening),
    (6, ConversationStage::Exploration),
    (9, ConversationStage::Analysis),
    (12, ConversationStage::Synthesis),
];

/// Stage reached after `message_count` messages with `roster_size` agents.
///
/// Thresholds scale with roster size: fewer than 1 round is the opening, then
/// 1.5, 2.25 and 3 rounds mark exploration, analysis and synthesis; anything
/// beyond is the conclusion. Non-decreasing in `message_count`.
pub fn derive_stage(message_count: usize, roster_size: usize) -> ConversationStage {
    let n = roster_size.max(1);
    let quarters = message_count.saturating_mul(4);
    for (bound, stage) in BOUNDARIES_IN_QUARTERS {
        if quarters < bound.saturating_mul(n) {
            return stage;
        }
    }
    ConversationStage::Conclusion
}
