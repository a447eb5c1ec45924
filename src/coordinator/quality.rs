//! Conversation quality analysis.

use super::agent::{Agent, TranscriptMessage};
use super::role::RoleRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Audit vocabulary used for topic coverage when no analyzer input is available.
pub const DEFAULT_VOCABULARY: &[&str] = &[
    "risk",
    "materiality",
    "internal control",
    "compliance",
    "revenue",
    "fraud",
    "sampling",
    "evidence",
    "going concern",
    "disclosure",
    "tax",
    "contract",
];

pub fn default_vocabulary() -> Vec<String> {
    DEFAULT_VOCABULARY.iter().map(|t| t.to_string()).collect()
}

const MIN_DIVERSE_SPEAKERS: usize = 3;
const LENGTH_IMBALANCE_RATIO: f64 = 3.0;
const COVERAGE_CAP: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participation {
    pub speaker_key: String,
    pub speaker_name: String,
    pub messages: usize,
    /// Share of all messages, 0-100.
    pub percentage: f64,
    /// Mean message length in characters.
    pub average_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityIssue {
    LowDiversity { unique_speakers: usize },
    /// Longest average message length divided by the shortest.
    UnbalancedLengths { ratio: f64 },
    NoModerator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// 0-100.
    pub score: u32,
    pub participation: Vec<Participation>,
    pub issues: Vec<QualityIssue>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    /// Vocabulary terms mentioned at least once, in vocabulary order.
    pub topics_covered: Vec<String>,
}

impl QualityReport {
    pub fn has_issue(&self, issue: &QualityIssue) -> bool {
        self.issues.iter().any(|i| std::mem::discriminant(i) == std::mem::discriminant(issue))
    }
}

/// Vocabulary terms appearing in any message, matched case-insensitively as substrings.
pub fn topic_coverage(transcript: &[TranscriptMessage], vocabulary: &[String]) -> Vec<String> {
    let lowered: Vec<String> = transcript.iter().map(|m| m.content.to_lowercase()).collect();
    let mut seen = HashSet::new();
    vocabulary
        .iter()
        .filter(|term| {
            let needle = term.to_lowercase();
            !needle.is_empty()
                && seen.insert(needle.clone())
                && lowered.iter().any(|text| text.contains(&needle))
        })
        .cloned()
        .collect()
}

/// Per-speaker participation. Roster agents come first in roster order, followed by
/// any other speakers in order of first appearance.
pub fn participation(roster: &[Agent], transcript: &[TranscriptMessage]) -> Vec<Participation> {
    let mut rows: Vec<Participation> = roster
        .iter()
        .map(|a| Participation {
            speaker_key: a.key.clone(),
            speaker_name: a.name.clone(),
            messages: 0,
            percentage: 0.0,
            average_length: 0.0,
        })
        .collect();
    let mut total_chars: Vec<usize> = vec![0; rows.len()];

    for message in transcript {
        let idx = match rows.iter().position(|r| r.speaker_key == message.speaker_key) {
            Some(idx) => idx,
            None => {
                rows.push(Participation {
                    speaker_key: message.speaker_key.clone(),
                    speaker_name: message.speaker_name.clone(),
                    messages: 0,
                    percentage: 0.0,
                    average_length: 0.0,
                });
                total_chars.push(0);
                rows.len() - 1
            }
        };
        rows[idx].messages += 1;
        total_chars[idx] += message.content.trim().chars().count();
    }

    let total = transcript.len();
    for (row, chars) in rows.iter_mut().zip(total_chars) {
        if row.messages > 0 {
            row.percentage = row.messages as f64 * 100.0 / total as f64;
            row.average_length = chars as f64 / row.messages as f64;
        }
    }
    rows
}

/// Score a transcript out of 100.
///
/// Diversity contributes up to 30 points, length balance 25, a participating moderator 15
/// and topic coverage 5 per covered term up to 30. An empty transcript scores 0.
pub fn analyze_quality(
    roster: &[Agent],
    transcript: &[TranscriptMessage],
    vocabulary: &[String],
    registry: &RoleRegistry,
) -> QualityReport {
    let participation = participation(roster, transcript);
    let topics_covered = topic_coverage(transcript, vocabulary);
    let mut issues = Vec::new();
    let mut strengths = Vec::new();
    let mut improvements = Vec::new();

    if transcript.is_empty() {
        issues.push(QualityIssue::LowDiversity { unique_speakers: 0 });
        issues.push(QualityIssue::NoModerator);
        improvements.push("Start the discussion with the moderator framing the objective".to_string());
        return QualityReport {
            score: 0,
            participation,
            issues,
            strengths,
            improvements,
            topics_covered,
        };
    }

    let active: Vec<&Participation> = participation.iter().filter(|p| p.messages > 0).collect();
    let unique = active.len();
    let mut score = 0u32;

    if unique >= MIN_DIVERSE_SPEAKERS {
        score += 30;
        strengths.push(format!("Broad participation from {} speakers", unique));
    } else {
        score += unique as u32 * 10;
        issues.push(QualityIssue::LowDiversity { unique_speakers: unique });
        improvements.push("Invite more participants to contribute their perspective".to_string());
    }

    let (min_len, max_len) = active.iter().fold((f64::MAX, 0.0f64), |(lo, hi), p| {
        (lo.min(p.average_length), hi.max(p.average_length))
    });
    // A speaker with only blank messages against any substantive one is unbalanced.
    let unbalanced = if min_len > 0.0 {
        max_len > LENGTH_IMBALANCE_RATIO * min_len
    } else {
        max_len > 0.0
    };
    if unbalanced {
        score += 10;
        // Blank averages are floored at one character to keep the ratio finite.
        issues.push(QualityIssue::UnbalancedLengths { ratio: max_len / min_len.max(1.0) });
        improvements.push("Balance contribution depth across participants".to_string());
    } else {
        score += 25;
        strengths.push("Contributions are balanced in depth".to_string());
    }

    let moderator_spoke = roster
        .iter()
        .filter(|a| registry.is_moderator(&a.role))
        .any(|a| transcript.iter().any(|m| m.speaker_key == a.key));
    if moderator_spoke {
        score += 15;
        strengths.push("A moderator is steering the discussion".to_string());
    } else {
        issues.push(QualityIssue::NoModerator);
        improvements.push("Involve a moderator to structure the discussion".to_string());
    }

    score += topics_covered.len().min(COVERAGE_CAP) as u32 * 5;
    if topics_covered.len() >= 3 {
        strengths.push(format!("Covers {} audit topics", topics_covered.len()));
    } else {
        let missing: Vec<&str> = vocabulary
            .iter()
            .filter(|t| !topics_covered.contains(t))
            .take(3)
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            improvements.push(format!("Broaden coverage to include {}", missing.join(", ")));
        }
    }

    QualityReport {
        score: score.min(100),
        participation,
        issues,
        strengths,
        improvements,
        topics_covered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::role;

    fn roster() -> Vec<Agent> {
        vec![
            Agent::new("mod", "Moderator", role::MODERATOR),
            Agent::new("fin", "Finance", role::FINANCIAL_EXPERT),
            Agent::new("sum", "Summary", role::SUMMARIZER),
        ]
    }

    fn msg(agent: &Agent, content: &str, seq: usize) -> TranscriptMessage {
        TranscriptMessage::from_agent(agent, content, seq)
    }

    #[test]
    fn test_empty_transcript_scores_zero() {
        let report = analyze_quality(&roster(), &[], &default_vocabulary(), &RoleRegistry::default());
        assert_eq!(report.score, 0);
        assert!(report.has_issue(&QualityIssue::NoModerator));
        assert!(report.participation.iter().all(|p| p.messages == 0));
    }

    #[test]
    fn test_full_marks_for_healthy_discussion() {
        let r = roster();
        let transcript = vec![
            msg(&r[0], "Let us discuss risk and materiality for revenue.", 0),
            msg(&r[1], "Internal control over revenue shows fraud indicators.", 1),
            msg(&r[2], "Sampling evidence supports the compliance conclusion.", 2),
        ];
        let report = analyze_quality(&r, &transcript, &default_vocabulary(), &RoleRegistry::default());
        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert!(report.topics_covered.len() >= 6);
        assert_eq!(report.score, 100);
        assert!((report.participation[0].percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_flags_issues() {
        let r = roster();
        let transcript = vec![
            msg(&r[1], "ok", 0),
            msg(&r[2], &"A very long and detailed explanation. ".repeat(5), 1),
        ];
        let report = analyze_quality(&r, &transcript, &default_vocabulary(), &RoleRegistry::default());
        assert!(report.has_issue(&QualityIssue::LowDiversity { unique_speakers: 0 }));
        assert!(report.has_issue(&QualityIssue::UnbalancedLengths { ratio: 0.0 }));
        assert!(report.has_issue(&QualityIssue::NoModerator));
        // 2 speakers (20) + unbalanced (10) + no moderator (0) + no coverage (0)
        assert_eq!(report.score, 30);
        assert!(!report.improvements.is_empty());
    }

    #[test]
    fn test_blank_contributions_count_as_unbalanced() {
        let r = roster();
        let transcript = vec![
            msg(&r[0], "We should look at the revenue cut-off.", 0),
            msg(&r[1], "   ", 1),
            msg(&r[2], "", 2),
        ];
        let report = analyze_quality(&r, &transcript, &default_vocabulary(), &RoleRegistry::default());
        assert_eq!(report.participation[1].average_length, 0.0);
        let ratio = report
            .issues
            .iter()
            .find_map(|i| match i {
                QualityIssue::UnbalancedLengths { ratio } => Some(*ratio),
                _ => None,
            })
            .unwrap();
        assert!(ratio.is_finite());
        assert_eq!(ratio, "We should look at the revenue cut-off.".len() as f64);
    }

    #[test]
    fn test_topic_coverage_case_insensitive() {
        let r = roster();
        let transcript = vec![msg(&r[0], "GOING CONCERN doubts and Tax exposure", 0)];
        let covered = topic_coverage(&transcript, &default_vocabulary());
        assert_eq!(covered, vec!["going concern".to_string(), "tax".to_string()]);
    }

    #[test]
    fn test_participation_includes_outside_speakers() {
        let r = roster();
        let transcript = vec![
            TranscriptMessage::new("user", "Auditor", "What about leases?", 0),
            msg(&r[0], "Good question.", 1),
        ];
        let rows = participation(&r, &transcript);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].speaker_key, "user");
        assert_eq!(rows[3].messages, 1);
        assert_eq!(rows[1].messages, 0);
    }
}
