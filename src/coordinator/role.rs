//! Role registry: scoring bonuses and roster inclusion rules per role key.

use super::analyzer::{ComplexityTier, ContextSignals};
use super::stage::ConversationStage;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub const MODERATOR: &str = "moderator";
pub const LEGAL_EXPERT: &str = "legal_expert";
pub const FINANCIAL_EXPERT: &str = "financial_expert";
pub const CRITICAL_REVIEWER: &str = "critical_reviewer";
pub const SUMMARIZER: &str = "summarizer";

/// What an inclusion rule sees while a roster is being assembled.
#[derive(Debug, Clone, Copy)]
pub struct InclusionContext<'a> {
    pub topic: &'a str,
    pub signals: &'a ContextSignals,
    /// Members already selected.
    pub roster_len: usize,
}

pub type InclusionRule = Arc<dyn Fn(&InclusionContext<'_>) -> bool + Send + Sync>;

/// Behaviour attached to a role key.
#[derive(Clone)]
pub struct RoleDescriptor {
    pub key: String,
    /// Agents with this role open the conversation and count as its moderator.
    pub moderates: bool,
    /// Shown in roster rationales.
    pub rationale: String,
    stage_bonuses: HashMap<ConversationStage, i32>,
    include: InclusionRule,
}

impl fmt::Debug for RoleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleDescriptor")
            .field("key", &self.key)
            .field("moderates", &self.moderates)
            .field("stage_bonuses", &self.stage_bonuses)
            .finish_non_exhaustive()
    }
}

impl RoleDescriptor {
    /// A role that is never auto-included and carries no stage bonus.
    pub fn new(key: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            moderates: false,
            rationale: rationale.into(),
            stage_bonuses: HashMap::new(),
            include: Arc::new(|_| false),
        }
    }
    pub fn moderating(mut self) -> Self {
        self.moderates = true;
        self
    }
    pub fn with_stage_bonus(mut self, stage: ConversationStage, bonus: i32) -> Self {
        self.stage_bonuses.insert(stage, bonus);
        self
    }
    pub fn include_when<F>(mut self, rule: F) -> Self
    where
        F: Fn(&InclusionContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.include = Arc::new(rule);
        self
    }

    pub fn stage_bonus(&self, stage: ConversationStage) -> i32 {
        self.stage_bonuses.get(&stage).copied().unwrap_or(0)
    }

    pub fn should_include(&self, ctx: &InclusionContext<'_>) -> bool {
        (self.include)(ctx)
    }
}

/// Ordered role registry. Roster assembly evaluates roles in registration order.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: Vec<RoleDescriptor>,
}

impl RoleRegistry {
    pub fn empty() -> Self {
        Self { roles: Vec::new() }
    }

    /// Adds a role, replacing any existing descriptor with the same key in place.
    pub fn register(&mut self, descriptor: RoleDescriptor) {
        match self.roles.iter_mut().find(|r| r.key == descriptor.key) {
            Some(slot) => *slot = descriptor,
            None => self.roles.push(descriptor),
        }
    }

    pub fn with_role(mut self, descriptor: RoleDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn get(&self, key: &str) -> Option<&RoleDescriptor> {
        self.roles.iter().find(|r| r.key == key)
    }

    pub fn roles(&self) -> &[RoleDescriptor] {
        &self.roles
    }

    pub fn stage_bonus(&self, role: &str, stage: ConversationStage) -> i32 {
        self.get(role).map(|r| r.stage_bonus(stage)).unwrap_or(0)
    }

    pub fn is_moderator(&self, role: &str) -> bool {
        self.get(role).map(|r| r.moderates).unwrap_or(false)
    }
}

impl Default for RoleRegistry {
    /// Moderator, legal and financial specialists, critical reviewer and summarizer.
    fn default() -> Self {
        use ConversationStage::*;
        RoleRegistry::empty()
            .with_role(
                RoleDescriptor::new(MODERATOR, "a moderator keeps the discussion structured")
                    .moderating()
                    .with_stage_bonus(Opening, 25)
                    .with_stage_bonus(Conclusion, 10)
                    .include_when(|_| true),
            )
            .with_role(
                RoleDescriptor::new(LEGAL_EXPERT, "legal and compliance material was detected")
                    .with_stage_bonus(Exploration, 10)
                    .with_stage_bonus(Analysis, 15)
                    .include_when(|ctx| ctx.signals.has_legal_content(ctx.topic)),
            )
            .with_role(
                RoleDescriptor::new(FINANCIAL_EXPERT, "financial statement content was detected")
                    .with_stage_bonus(Exploration, 10)
                    .with_stage_bonus(Analysis, 15)
                    .include_when(|ctx| ctx.signals.has_financial_content(ctx.topic)),
            )
            .with_role(
                RoleDescriptor::new(
                    CRITICAL_REVIEWER,
                    "a critical perspective challenges assumptions",
                )
                .with_stage_bonus(Analysis, 10)
                .with_stage_bonus(Synthesis, 10)
                .include_when(|ctx| {
                    ctx.signals.complexity == ComplexityTier::High || ctx.roster_len < 3
                }),
            )
            .with_role(
                RoleDescriptor::new(SUMMARIZER, "a summarizer consolidates a larger panel")
                    .with_stage_bonus(Synthesis, 15)
                    .with_stage_bonus(Conclusion, 25)
                    .include_when(|ctx| ctx.roster_len >= 3),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(topic: &'a str, signals: &'a ContextSignals, roster_len: usize) -> InclusionContext<'a> {
        InclusionContext { topic, signals, roster_len }
    }

    #[test]
    fn test_default_registry_order() {
        let registry = RoleRegistry::default();
        let keys: Vec<&str> = registry.roles().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec![MODERATOR, LEGAL_EXPERT, FINANCIAL_EXPERT, CRITICAL_REVIEWER, SUMMARIZER]);
        assert!(registry.is_moderator(MODERATOR));
        assert!(!registry.is_moderator(SUMMARIZER));
        assert!(!registry.is_moderator("unknown"));
    }

    #[test]
    fn test_stage_bonuses() {
        let registry = RoleRegistry::default();
        assert_eq!(registry.stage_bonus(MODERATOR, ConversationStage::Opening), 25);
        assert_eq!(registry.stage_bonus(SUMMARIZER, ConversationStage::Conclusion), 25);
        assert_eq!(registry.stage_bonus(LEGAL_EXPERT, ConversationStage::Analysis), 15);
        assert_eq!(registry.stage_bonus(MODERATOR, ConversationStage::Analysis), 0);
        assert_eq!(registry.stage_bonus("unknown", ConversationStage::Opening), 0);
    }

    #[test]
    fn test_inclusion_rules() {
        let registry = RoleRegistry::default();
        let plain = ContextSignals::default();
        let complex = ContextSignals { complexity: ComplexityTier::High, ..Default::default() };
        let critic = registry.get(CRITICAL_REVIEWER).unwrap();
        assert!(critic.should_include(&ctx("x", &plain, 2)));
        assert!(!critic.should_include(&ctx("x", &plain, 3)));
        assert!(critic.should_include(&ctx("x", &complex, 4)));

        let summarizer = registry.get(SUMMARIZER).unwrap();
        assert!(!summarizer.should_include(&ctx("x", &plain, 2)));
        assert!(summarizer.should_include(&ctx("x", &plain, 3)));

        let legal = registry.get(LEGAL_EXPERT).unwrap();
        assert!(legal.should_include(&ctx("Review supplier contracts", &plain, 1)));
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut registry = RoleRegistry::default();
        registry.register(RoleDescriptor::new(LEGAL_EXPERT, "always").include_when(|_| true));
        registry.register(RoleDescriptor::new("it_auditor", "systems in scope"));
        assert_eq!(registry.roles()[1].key, LEGAL_EXPERT);
        assert_eq!(registry.roles()[1].rationale, "always");
        assert_eq!(registry.roles().last().unwrap().key, "it_auditor");
    }
}
