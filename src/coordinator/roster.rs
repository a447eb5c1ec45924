//! Roster recommendation.

use super::agent::{Agent, AgentCatalog};
use super::analyzer::ContextSignals;
use super::role::{self, InclusionContext, RoleRegistry};
use serde::{Deserialize, Serialize};

/// Confidence reported when the analyzer could not be consulted.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterRecommendation {
    pub agents: Vec<Agent>,
    pub rationale: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Built from fixed defaults because analyzer signals were unavailable.
    #[serde(default)]
    pub degraded: bool,
}

impl RosterRecommendation {
    pub fn agent_keys(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.key.as_str()).collect()
    }
}

/// Walk the registry in order, adding the first catalog agent of every role whose
/// inclusion rule passes, until `max_size` agents are selected.
pub fn build_roster(
    topic: &str,
    signals: &ContextSignals,
    registry: &RoleRegistry,
    catalog: &AgentCatalog,
    max_size: usize,
) -> RosterRecommendation {
    let mut agents: Vec<Agent> = Vec::new();
    let mut reasons: Vec<String> = Vec::new();

    for descriptor in registry.roles() {
        if agents.len() >= max_size {
            break;
        }
        let ctx = InclusionContext {
            topic,
            signals,
            roster_len: agents.len(),
        };
        if !descriptor.should_include(&ctx) {
            continue;
        }
        let Some(agent) = catalog.find_by_role(&descriptor.key) else {
            tracing::debug!(role = %descriptor.key, "no catalog agent for included role");
            continue;
        };
        if agents.iter().any(|a| a.key == agent.key) {
            continue;
        }
        reasons.push(format!("{} ({})", agent.name, descriptor.rationale));
        agents.push(agent.clone());
    }

    let rationale = format!(
        "Selected {} agent(s) for \"{}\" at {} risk: {}",
        agents.len(),
        topic,
        signals.risk_level,
        reasons.join("; ")
    );
    RosterRecommendation {
        agents,
        rationale,
        confidence: signals.confidence.clamp(0.0, 1.0),
        degraded: false,
    }
}

/// Conservative roster used when analyzer signals are unavailable: moderator, critical
/// reviewer and summarizer, in that order, truncated to `max_size`.
pub fn default_roster(catalog: &AgentCatalog, max_size: usize) -> RosterRecommendation {
    let agents: Vec<Agent> = [role::MODERATOR, role::CRITICAL_REVIEWER, role::SUMMARIZER]
        .iter()
        .filter_map(|r| catalog.find_by_role(r).cloned())
        .take(max_size)
        .collect();
    RosterRecommendation {
        rationale: format!(
            "Context analysis unavailable; using the default panel of {} agent(s)",
            agents.len()
        ),
        agents,
        confidence: NEUTRAL_CONFIDENCE,
        degraded: true,
    }
}
