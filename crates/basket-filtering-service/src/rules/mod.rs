//! 确定性规则评估与规则加载

pub mod engine;
pub mod loader;

pub use engine::{ABSOLUTE_CONFIDENCE, RULE_MATCH_CONFIDENCE, RuleEngine, RuleOutcome, RuleVerdict};
pub use loader::MerchantRulesLoader;
