//! Context analyzer collaborator and the signals it produces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientSize {
    Small,
    #[default]
    Medium,
    Large,
    Enterprise,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        })
    }
}

/// Structured signals about the engagement behind a conversation topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSignals {
    pub document_types: Vec<String>,
    pub risk_level: RiskLevel,
    pub complexity: ComplexityTier,
    pub client_size: ClientSize,
    pub user_role: String,
    /// The analyzer's own confidence in these signals, in `[0, 1]`.
    pub confidence: f64,
}

impl Default for ContextSignals {
    fn default() -> Self {
        Self {
            document_types: Vec::new(),
            risk_level: RiskLevel::Medium,
            complexity: ComplexityTier::Medium,
            client_size: ClientSize::Medium,
            user_role: String::new(),
            confidence: 0.5,
        }
    }
}

const LEGAL_TERMS: &[&str] = &[
    "contract",
    "agreement",
    "legal",
    "compliance",
    "regulat",
    "litigation",
    "lease",
    "covenant",
];

const FINANCIAL_TERMS: &[&str] = &[
    "financial",
    "balance sheet",
    "income statement",
    "cash flow",
    "ledger",
    "revenue",
    "tax",
    "invoice",
    "trial balance",
];

fn mentions_any(haystacks: &[&str], terms: &[&str]) -> bool {
    haystacks.iter().any(|h| {
        let lower = h.to_lowercase();
        terms.iter().any(|t| lower.contains(t))
    })
}

impl ContextSignals {
    /// Signals are usable only with a finite confidence in `[0, 1]`.
    pub fn is_well_formed(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }

    fn haystacks<'a>(&'a self, topic: &'a str) -> Vec<&'a str> {
        std::iter::once(topic)
            .chain(self.document_types.iter().map(String::as_str))
            .collect()
    }

    pub fn has_legal_content(&self, topic: &str) -> bool {
        mentions_any(&self.haystacks(topic), LEGAL_TERMS)
    }

    pub fn has_financial_content(&self, topic: &str) -> bool {
        mentions_any(&self.haystacks(topic), FINANCIAL_TERMS)
    }
}

/// External collaborator that inspects documents, client and risk data for a topic.
///
/// Implementations should return promptly; the coordinator bounds every call with a
/// timeout and falls back to fixed defaults on any failure.
#[async_trait]
pub trait ContextAnalyzer: Send + Sync {
    async fn analyze(&self, topic: &str) -> anyhow::Result<ContextSignals>;
}

/// Analyzer returning the same precomputed signals for every topic.
#[derive(Debug, Clone, Default)]
pub struct StaticContextAnalyzer {
    signals: ContextSignals,
}

impl StaticContextAnalyzer {
    pub fn new(signals: ContextSignals) -> Self {
        Self { signals }
    }
}

#[async_trait]
impl ContextAnalyzer for StaticContextAnalyzer {
    async fn analyze(&self, _topic: &str) -> anyhow::Result<ContextSignals> {
        Ok(self.signals.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_detection_from_topic_and_documents() {
        let signals = ContextSignals {
            document_types: vec!["Lease Agreement".into()],
            ..Default::default()
        };
        assert!(signals.has_legal_content("year-end review"));
        assert!(!signals.has_financial_content("year-end review"));
        assert!(signals.has_financial_content("Revenue recognition"));
        assert!(ContextSignals::default().has_legal_content("Regulatory filings"));
    }

    #[test]
    fn test_well_formed() {
        assert!(ContextSignals::default().is_well_formed());
        for bad in [f64::NAN, -0.1, 1.5, f64::INFINITY] {
            let s = ContextSignals { confidence: bad, ..Default::default() };
            assert!(!s.is_well_formed());
        }
    }

    #[test]
    fn test_signals_from_partial_json() {
        let s: ContextSignals =
            serde_json::from_str(r#"{"risk_level":"high","complexity":"high","confidence":0.9}"#).unwrap();
        assert_eq!(s.risk_level, RiskLevel::High);
        assert_eq!(s.complexity, ComplexityTier::High);
        assert_eq!(s.client_size, ClientSize::Medium);
        assert!(s.document_types.is_empty());
    }

    #[tokio::test]
    async fn test_static_analyzer() {
        let analyzer = StaticContextAnalyzer::new(ContextSignals { confidence: 0.8, ..Default::default() });
        assert_eq!(analyzer.analyze("anything").await.unwrap().confidence, 0.8);
    }
}
