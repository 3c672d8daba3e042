//! 确定性规则引擎
//!
//! 按固定顺序评估商户类目规则、绝对禁止关键词与酒精策略，
//! 先匹配者生效。没有任何规则命中时返回"未决"，交给 AI 分类。

use tracing::debug;

use crate::models::{BasketItem, MerchantRules};

/// 类目规则命中时的置信度
pub const RULE_MATCH_CONFIDENCE: f64 = 0.95;
/// 绝对判定（禁止关键词、酒精策略）的置信度
pub const ABSOLUTE_CONFIDENCE: f64 = 1.0;

/// 绝对禁止关键词
///
/// 无论商户规则如何配置，命中即不可用。全部小写，
/// 与 `BasketItem::searchable_text` 的小写文本做子串匹配。
const PROHIBITED_KEYWORDS: &[&str] = &[
    "wine",
    "beer",
    "vodka",
    "whisky",
    "whiskey",
    "rum",
    "gin",
    "tequila",
    "liqueur",
    "champagne",
    "prosecco",
    "cider",
    "sake",
    "cigarette",
    "cigar",
    "tobacco",
    "葡萄酒",
    "啤酒",
    "白酒",
    "香烟",
];

/// 规则判定结果
#[derive(Debug, Clone, PartialEq)]
pub struct RuleVerdict {
    pub eligible: bool,
    pub confidence: f64,
    pub reason: String,
    pub category: String,
}

/// 规则评估结果
///
/// `Undecided` 是流程分支而非错误：其隐含置信度为 0.0，
/// 绝不作为最终判定对外输出。
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Definitive(RuleVerdict),
    Undecided,
}

impl RuleOutcome {
    pub fn is_definitive(&self) -> bool {
        matches!(self, Self::Definitive(_))
    }
}

/// 确定性规则引擎
pub struct RuleEngine;

impl RuleEngine {
    /// 评估商品
    ///
    /// 匹配顺序：
    /// 1. 商户类目规则（有序，先匹配者生效）
    /// 2. 绝对禁止关键词（酒精/烟草类，不受商户规则影响）
    /// 3. 商品含酒精属性对照商户的套餐酒精策略
    pub fn evaluate(item: &BasketItem, rules: &MerchantRules) -> RuleOutcome {
        for rule in &rules.category_rules {
            if !rule.matches(item) {
                continue;
            }

            // 命中规则自带酒精度上限时，超限即不可用
            if let (Some(cap), Some(abv)) = (rule.max_alcohol_percentage, item.alcohol_percentage) {
                if abv > cap {
                    debug!(sku = %item.sku, rule = %rule.name, abv, cap, "酒精度超过类目上限");
                    return RuleOutcome::Definitive(RuleVerdict {
                        eligible: false,
                        confidence: RULE_MATCH_CONFIDENCE,
                        reason: format!(
                            "酒精度 {:.1}% 超过类目 {} 的上限 {:.1}%",
                            abv, rule.name, cap
                        ),
                        category: rule.name.clone(),
                    });
                }
            }

            debug!(sku = %item.sku, rule = %rule.name, eligible = rule.eligible, "命中商户类目规则");
            return RuleOutcome::Definitive(RuleVerdict {
                eligible: rule.eligible,
                confidence: RULE_MATCH_CONFIDENCE,
                reason: if rule.eligible {
                    format!("命中商户类目规则 {}，可用餐饮券支付", rule.name)
                } else {
                    format!("命中商户类目规则 {}，不可用餐饮券支付", rule.name)
                },
                category: rule.name.clone(),
            });
        }

        let text = item.searchable_text();
        if let Some(keyword) = PROHIBITED_KEYWORDS.iter().find(|kw| text.contains(*kw)) {
            debug!(sku = %item.sku, keyword = *keyword, "命中绝对禁止关键词");
            return RuleOutcome::Definitive(RuleVerdict {
                eligible: false,
                confidence: ABSOLUTE_CONFIDENCE,
                reason: format!("商品名称/描述命中绝对禁止关键词: {}", keyword),
                category: "prohibited".to_string(),
            });
        }

        if item.contains_alcohol {
            let permitted = !rules.alcohol_prohibited
                && item.is_combo
                && rules.allow_alcohol_in_combo;
            if !permitted {
                debug!(sku = %item.sku, is_combo = item.is_combo, "商品含酒精且商户策略不允许");
                return RuleOutcome::Definitive(RuleVerdict {
                    eligible: false,
                    confidence: ABSOLUTE_CONFIDENCE,
                    reason: "商品含酒精且商户策略不允许".to_string(),
                    category: "alcoholic".to_string(),
                });
            }
        }

        RuleOutcome::Undecided
    }
}
