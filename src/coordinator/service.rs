//! Conversation coordinator: analyzer-backed roster, quality and summary operations.

use super::agent::{Agent, AgentCatalog, TranscriptMessage};
use super::analyzer::{ContextAnalyzer, ContextSignals};
use super::quality::{self, default_vocabulary, QualityReport};
use super::role::RoleRegistry;
use super::roster::{build_roster, default_roster, RosterRecommendation};
use super::session::{ConversationSession, ConversationState};
use super::speaker;
use super::summary::{generic_executive_summary, summarize_transcript, ConversationSummary};
use crate::cache::{CacheKeyGenerator, CacheManager};
use crate::error::ErrorContext;
use crate::utils::duration_ms;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Upper bound on a single analyzer call.
    #[serde(rename = "analyzer_timeout_ms", with = "duration_ms")]
    pub analyzer_timeout: Duration,
    /// Cache strategy used to memoize roster recommendations.
    pub recommendation_strategy: String,
    pub max_roster_size: usize,
    /// YAML agent catalog; the built-in catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            analyzer_timeout: Duration::from_secs(5),
            recommendation_strategy: "recommendations".to_string(),
            max_roster_size: 5,
            catalog_path: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_analyzer_timeout(mut self, timeout: Duration) -> Self {
        self.analyzer_timeout = timeout;
        self
    }
    pub fn with_max_roster_size(mut self, n: usize) -> Self {
        self.max_roster_size = n;
        self
    }
    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_roster_size == 0 {
            return Err(Error::configuration_with_context(
                "max roster size must be at least 1",
                ErrorContext::new()
                    .with_field_path("coordinator.max_roster_size")
                    .with_component("coordinator_config"),
            ));
        }
        if self.analyzer_timeout.is_zero() {
            return Err(Error::configuration_with_context(
                "analyzer timeout must be positive",
                ErrorContext::new()
                    .with_field_path("coordinator.analyzer_timeout_ms")
                    .with_component("coordinator_config"),
            ));
        }
        Ok(())
    }
}

/// Multi-agent conversation coordinator.
///
/// Pure conversation logic (stage, next speaker, quality, summary) lives in the sibling
/// modules; this type adds the context analyzer, the agent catalog and recommendation
/// caching on top. Analyzer problems never surface as errors: every operation falls back
/// to fixed defaults.
pub struct ConversationCoordinator {
    config: CoordinatorConfig,
    analyzer: Arc<dyn ContextAnalyzer>,
    registry: Arc<RoleRegistry>,
    catalog: AgentCatalog,
    cache: Option<Arc<CacheManager>>,
    keys: CacheKeyGenerator,
}

impl ConversationCoordinator {
    pub fn new(config: CoordinatorConfig, analyzer: Arc<dyn ContextAnalyzer>) -> Result<Self> {
        config.validate()?;
        let catalog = match config.catalog_path {
            Some(ref path) => AgentCatalog::from_path(path)?,
            None => AgentCatalog::default(),
        };
        Ok(Self {
            config,
            analyzer,
            registry: Arc::new(RoleRegistry::default()),
            catalog,
            cache: None,
            keys: CacheKeyGenerator::new("roster"),
        })
    }

    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_registry(mut self, registry: RoleRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_catalog(mut self, catalog: AgentCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &AgentCatalog {
        &self.catalog
    }

    /// Consult the analyzer. `None` when it fails, times out or returns malformed signals.
    pub async fn signals(&self, topic: &str) -> Option<ContextSignals> {
        match tokio::time::timeout(self.config.analyzer_timeout, self.analyzer.analyze(topic)).await {
            Ok(Ok(signals)) if signals.is_well_formed() => Some(signals),
            Ok(Ok(signals)) => {
                warn!(topic, confidence = signals.confidence, "malformed context signals, using defaults");
                None
            }
            Ok(Err(e)) => {
                warn!(topic, error = %e, "context analyzer failed, using defaults");
                None
            }
            Err(_) => {
                warn!(
                    topic,
                    timeout_ms = self.config.analyzer_timeout.as_millis() as u64,
                    "context analyzer timed out, using defaults"
                );
                None
            }
        }
    }

    fn roster_cache_key(&self, topic: &str) -> String {
        let max = self.config.max_roster_size.to_string();
        self.keys.generate(&[("topic", topic), ("max_roster_size", &max)])
    }

    /// Recommend a roster for `topic`. Successful recommendations are memoized.
    pub async fn recommend_roster(&self, topic: &str) -> RosterRecommendation {
        let strategy = self.config.recommendation_strategy.as_str();
        let key = self.roster_cache_key(topic);
        if let Some(cache) = self.cache.as_deref() {
            if let Some(value) = cache.get(&key, strategy).await {
                match serde_json::from_value::<RosterRecommendation>(value) {
                    Ok(cached) => {
                        debug!(topic, "roster recommendation served from cache");
                        return cached;
                    }
                    Err(e) => warn!(topic, error = %e, "discarding unreadable cached roster"),
                }
            }
        }

        let Some(signals) = self.signals(topic).await else {
            return default_roster(&self.catalog, self.config.max_roster_size);
        };
        let recommendation = build_roster(
            topic,
            &signals,
            &self.registry,
            &self.catalog,
            self.config.max_roster_size,
        );
        debug!(
            topic,
            agents = recommendation.agents.len(),
            confidence = recommendation.confidence,
            "roster recommended"
        );

        if let Some(cache) = self.cache.as_deref() {
            match serde_json::to_value(&recommendation) {
                Ok(value) => {
                    // Durable replication is best effort; the handle is dropped on purpose.
                    let _ = cache.set(&key, value, strategy, None).await;
                }
                Err(e) => warn!(topic, error = %e, "roster recommendation not cached"),
            }
        }
        recommendation
    }

    /// Quality report with the audit vocabulary extended by the analyzer's document types.
    pub async fn analyze_quality(
        &self,
        topic: &str,
        roster: &[Agent],
        transcript: &[TranscriptMessage],
    ) -> QualityReport {
        let mut vocabulary = default_vocabulary();
        if let Some(signals) = self.signals(topic).await {
            for doc in signals.document_types {
                let term = doc.trim().to_lowercase();
                if !term.is_empty() && !vocabulary.contains(&term) {
                    vocabulary.push(term);
                }
            }
        }
        quality::analyze_quality(roster, transcript, &vocabulary, &self.registry)
    }

    /// Summary annotated with the assessed risk level, or a generic executive summary when
    /// context analysis is unavailable.
    pub async fn summarize(
        &self,
        topic: &str,
        roster: &[Agent],
        transcript: &[TranscriptMessage],
    ) -> ConversationSummary {
        let mut summary = summarize_transcript(topic, roster, transcript);
        match self.signals(topic).await {
            Some(signals) => {
                summary
                    .executive_summary
                    .push_str(&format!(" Assessed risk level: {}.", signals.risk_level));
            }
            None => summary.executive_summary = generic_executive_summary(topic, transcript.len()),
        }
        summary
    }

    pub fn determine_next_speaker<'a>(
        &self,
        roster: &'a [Agent],
        transcript: &[TranscriptMessage],
    ) -> Option<&'a Agent> {
        speaker::determine_next_speaker(roster, transcript, &self.registry)
    }

    pub fn conversation_state(
        &self,
        topic: &str,
        roster: &[Agent],
        transcript: &[TranscriptMessage],
    ) -> ConversationState {
        ConversationState::derive(roster, transcript, topic, &self.registry)
    }

    /// Open a session with the recommended roster for `topic`.
    pub async fn start_session(&self, topic: &str) -> ConversationSession {
        let recommendation = self.recommend_roster(topic).await;
        ConversationSession::new(topic, recommendation.agents, self.registry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::coordinator::analyzer::{RiskLevel, StaticContextAnalyzer};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAnalyzer {
        calls: AtomicUsize,
        signals: ContextSignals,
    }

    #[async_trait]
    impl ContextAnalyzer for CountingAnalyzer {
        async fn analyze(&self, _topic: &str) -> anyhow::Result<ContextSignals> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.signals.clone())
        }
    }

    struct BrokenAnalyzer;

    #[async_trait]
    impl ContextAnalyzer for BrokenAnalyzer {
        async fn analyze(&self, _topic: &str) -> anyhow::Result<ContextSignals> {
            anyhow::bail!("document index offline")
        }
    }

    struct SlowAnalyzer;

    #[async_trait]
    impl ContextAnalyzer for SlowAnalyzer {
        async fn analyze(&self, _topic: &str) -> anyhow::Result<ContextSignals> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ContextSignals::default())
        }
    }

    fn coordinator(analyzer: Arc<dyn ContextAnalyzer>) -> ConversationCoordinator {
        ConversationCoordinator::new(
            CoordinatorConfig::new().with_analyzer_timeout(Duration::from_millis(50)),
            analyzer,
        )
        .unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(CoordinatorConfig::default().validate().is_ok());
        assert!(CoordinatorConfig::new().with_max_roster_size(0).validate().is_err());
        assert!(CoordinatorConfig::new()
            .with_analyzer_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_missing_catalog_file_is_an_error() {
        let config = CoordinatorConfig::new().with_catalog_path("/nonexistent/agents.yaml");
        let result = ConversationCoordinator::new(config, Arc::new(StaticContextAnalyzer::default()));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_failing_analyzer_degrades() {
        let c = coordinator(Arc::new(BrokenAnalyzer));
        let rec = c.recommend_roster("Lease contracts").await;
        assert!(rec.degraded);
        assert_eq!(rec.agents.len(), 3);
        assert_eq!(rec.confidence, 0.5);

        let summary = c.summarize("Lease contracts", &rec.agents, &[]).await;
        assert!(summary.executive_summary.contains("context was unavailable"));
    }

    #[tokio::test]
    async fn test_degraded_roster_respects_max_size() {
        let c = ConversationCoordinator::new(
            CoordinatorConfig::new().with_max_roster_size(2),
            Arc::new(BrokenAnalyzer),
        )
        .unwrap();
        let rec = c.recommend_roster("Lease contracts").await;
        assert!(rec.degraded);
        assert_eq!(rec.agent_keys(), vec!["audit_moderator", "devils_advocate"]);
    }

    #[tokio::test]
    async fn test_slow_analyzer_times_out() {
        let c = coordinator(Arc::new(SlowAnalyzer));
        let rec = c.recommend_roster("Anything").await;
        assert!(rec.degraded);
    }

    #[tokio::test]
    async fn test_malformed_signals_degrade() {
        let analyzer = StaticContextAnalyzer::new(ContextSignals {
            confidence: f64::NAN,
            ..Default::default()
        });
        let c = coordinator(Arc::new(analyzer));
        assert!(c.signals("x").await.is_none());
        assert!(c.recommend_roster("x").await.degraded);
    }

    #[tokio::test]
    async fn test_recommendation_memoized_in_cache() {
        let analyzer = Arc::new(CountingAnalyzer {
            calls: AtomicUsize::new(0),
            signals: ContextSignals { confidence: 0.8, ..Default::default() },
        });
        let cache = Arc::new(CacheManager::in_memory(CacheConfig::default()).unwrap());
        let c = coordinator(analyzer.clone()).with_cache(cache.clone());

        let first = c.recommend_roster("Revenue testing").await;
        let second = c.recommend_roster("Revenue testing").await;
        assert_eq!(first, second);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len_for("recommendations").await, 1);

        c.recommend_roster("Payroll").await;
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_degraded_recommendation_not_cached() {
        let cache = Arc::new(CacheManager::in_memory(CacheConfig::default()).unwrap());
        let c = coordinator(Arc::new(BrokenAnalyzer)).with_cache(cache.clone());
        c.recommend_roster("Payroll").await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_summary_annotated_with_risk() {
        let analyzer = StaticContextAnalyzer::new(ContextSignals {
            risk_level: RiskLevel::High,
            ..Default::default()
        });
        let c = coordinator(Arc::new(analyzer));
        let roster = c.catalog().agents().to_vec();
        let transcript = vec![TranscriptMessage::from_agent(&roster[0], "We agreed on scope.", 0)];
        let summary = c.summarize("Scope", &roster, &transcript).await;
        assert!(summary.executive_summary.ends_with("Assessed risk level: high."));
    }

    #[tokio::test]
    async fn test_quality_vocabulary_extended_by_documents() {
        let analyzer = StaticContextAnalyzer::new(ContextSignals {
            document_types: vec!["Lease Schedule".into()],
            ..Default::default()
        });
        let c = coordinator(Arc::new(analyzer));
        let roster = c.catalog().agents().to_vec();
        let transcript = vec![TranscriptMessage::from_agent(
            &roster[0],
            "The lease schedule was updated.",
            0,
        )];
        let report = c.analyze_quality("Leases", &roster, &transcript).await;
        assert_eq!(report.topics_covered, vec!["lease schedule".to_string()]);
    }

    #[tokio::test]
    async fn test_start_session_uses_recommendation() {
        let c = coordinator(Arc::new(StaticContextAnalyzer::default()));
        let session = c.start_session("Kick-off").await;
        assert_eq!(session.roster().len(), 2);
        assert_eq!(session.next_speaker().unwrap().key, "audit_moderator");
    }
}
