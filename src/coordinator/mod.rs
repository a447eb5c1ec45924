//! 多智能体会话协调模块：阶段推导、发言人选择、阵容推荐、质量分析和摘要生成。
//!
//! # Conversation Coordination Module
//!
//! Coordinates multi-agent audit discussions: who is on the panel, who speaks next,
//! how well the discussion is going and what it concluded.
//!
//! ## Overview
//!
//! - **Stage**: derived from transcript length relative to roster size, never regresses
//! - **Next speaker**: participation deficit, stage/role bonus and repeat penalty,
//!   with role behaviour looked up in a [`RoleRegistry`]
//! - **Roster**: built from an [`AgentCatalog`] using [`ContextAnalyzer`] signals
//! - **Quality and summary**: deterministic heuristics over the transcript
//! - **Degradation**: analyzer failures fall back to fixed defaults, never errors
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ConversationCoordinator`] | Analyzer-backed roster, quality and summary operations |
//! | [`ConversationSession`] | Roster plus append-only transcript |
//! | [`ConversationState`] | Per-turn snapshot recomputed from the transcript |
//! | [`RoleRegistry`] | Role key to stage bonuses and inclusion rule |
//! | [`AgentCatalog`] | Agents available for recommendation |
//!
//! ## Example
//!
//! ```rust
//! use assist_orchestrator::coordinator::{
//!     ConversationCoordinator, ConversationStage, CoordinatorConfig, StaticContextAnalyzer,
//! };
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let coordinator = ConversationCoordinator::new(
//!     CoordinatorConfig::default(),
//!     Arc::new(StaticContextAnalyzer::default()),
//! )
//! .unwrap();
//!
//! let mut session = coordinator.start_session("Inventory observation").await;
//! let opener = session.next_speaker().unwrap().key.clone();
//! session.post(&opener, "Let us agree the count procedures.").unwrap();
//! assert_eq!(session.state().stage, ConversationStage::Opening);
//! # });
//! ```

mod agent;
mod analyzer;
mod quality;
pub mod role;
mod roster;
mod service;
mod session;
mod speaker;
mod stage;
mod summary;

pub use agent::{Agent, AgentCatalog, GenerationParams, TranscriptMessage};
pub use analyzer::{
    ClientSize, ComplexityTier, ContextAnalyzer, ContextSignals, RiskLevel, StaticContextAnalyzer,
};
pub use quality::{
    analyze_quality, default_vocabulary, participation, topic_coverage, Participation,
    QualityIssue, QualityReport, DEFAULT_VOCABULARY,
};
pub use role::{InclusionContext, InclusionRule, RoleDescriptor, RoleRegistry};
pub use roster::{build_roster, default_roster, RosterRecommendation, NEUTRAL_CONFIDENCE};
pub use service::{ConversationCoordinator, CoordinatorConfig};
pub use session::{ConversationSession, ConversationState};
pub use speaker::{current_stage, determine_next_speaker, score_candidates, SpeakerScore};
pub use stage::{derive_stage, ConversationStage};
pub use summary::{generic_executive_summary, summarize_transcript, Contribution, ConversationSummary};
