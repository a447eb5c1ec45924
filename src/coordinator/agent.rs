//! Agents, the agent catalog and transcript messages.

use super::role;
use crate::error::ErrorContext;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Generation parameters handed to the text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Creativity in `[0, 2]`.
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 800,
        }
    }
}

/// A conversation participant. Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub key: String,
    pub name: String,
    /// Role key resolved through the `RoleRegistry`.
    pub role: String,
    pub directive: String,
    #[serde(default)]
    pub params: GenerationParams,
    /// Data-scope tags this agent may read.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Agent {
    pub fn new(key: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            role: role.into(),
            directive: String::new(),
            params: GenerationParams::default(),
            scopes: Vec::new(),
        }
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = directive.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.params.temperature = temperature;
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }
}

/// A single transcript entry. Sequence positions start at 0 and increase by one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub speaker_key: String,
    pub speaker_name: String,
    pub content: String,
    pub sequence: usize,
}

impl TranscriptMessage {
    pub fn new(
        speaker_key: impl Into<String>,
        speaker_name: impl Into<String>,
        content: impl Into<String>,
        sequence: usize,
    ) -> Self {
        Self {
            speaker_key: speaker_key.into(),
            speaker_name: speaker_name.into(),
            content: content.into(),
            sequence,
        }
    }

    /// Message spoken by `agent`.
    pub fn from_agent(agent: &Agent, content: impl Into<String>, sequence: usize) -> Self {
        Self::new(&agent.key, &agent.name, content, sequence)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    agents: Vec<Agent>,
}

/// Static list of agents that roster recommendation selects from.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentCatalog {
    agents: Vec<Agent>,
}

impl AgentCatalog {
    pub fn new(agents: Vec<Agent>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (idx, agent) in agents.iter().enumerate() {
            if agent.key.trim().is_empty() || agent.role.trim().is_empty() {
                return Err(Error::configuration_with_context(
                    "agent key and role must not be empty",
                    ErrorContext::new()
                        .with_field_path(format!("agents[{}]", idx))
                        .with_component("agent_catalog"),
                ));
            }
            if !seen.insert(agent.key.as_str()) {
                return Err(Error::configuration_with_context(
                    format!("duplicate agent key '{}'", agent.key),
                    ErrorContext::new()
                        .with_field_path(format!("agents[{}].key", idx))
                        .with_component("agent_catalog"),
                ));
            }
        }
        Ok(Self { agents })
    }

    /// Parse a catalog document of the form `agents: [ {key, name, role, directive, ...} ]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.agents)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn get(&self, key: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.key == key)
    }

    /// First agent declared with `role`.
    pub fn find_by_role(&self, role: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.role == role)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentCatalog {
    fn default() -> Self {
        Self {
            agents: vec![
                Agent::new("audit_moderator", "Audit Moderator", role::MODERATOR)
                    .with_directive(
                        "Guide the discussion, keep it on the audit objective and invite each participant to contribute.",
                    )
                    .with_temperature(0.5)
                    .with_scopes(["engagement", "planning"]),
                Agent::new("legal_counsel", "Legal Counsel", role::LEGAL_EXPERT)
                    .with_directive(
                        "Assess contractual obligations, regulatory exposure and compliance findings.",
                    )
                    .with_temperature(0.3)
                    .with_scopes(["contracts", "regulatory"]),
                Agent::new("financial_analyst", "Financial Analyst", role::FINANCIAL_EXPERT)
                    .with_directive(
                        "Analyse financial statements, materiality and account balances for misstatement risk.",
                    )
                    .with_temperature(0.3)
                    .with_scopes(["ledger", "financial_statements"]),
                Agent::new("devils_advocate", "Devil's Advocate", role::CRITICAL_REVIEWER)
                    .with_directive(
                        "Challenge assumptions, probe weak evidence and surface alternative explanations.",
                    )
                    .with_temperature(0.9)
                    .with_scopes(["engagement"]),
                Agent::new("audit_summarizer", "Audit Summarizer", role::SUMMARIZER)
                    .with_directive(
                        "Consolidate the discussion into conclusions, decisions and follow-up actions.",
                    )
                    .with_temperature(0.4)
                    .with_scopes(["engagement", "reporting"]),
            ],
        }
    }
}
