//! 业务规则安全校验
//!
//! AI 可以判定"可用"，但商户/国家的硬性约束拥有最终否决权。
//! 校验只收紧判定，绝不放宽：不可用的判定原样通过。
//! 校验过程自身出错时降级为保守的不可用判定——出错时绝不放行。

use chrono::Utc;
use tracing::{debug, warn};

use voucher_shared::error::{Result, VoucherError};

use crate::models::{AiVerdict, BasketItem, MerchantRules, VerdictSource};

/// 酒精禁令覆盖时的置信度下限
const ALCOHOL_OVERRIDE_MIN_CONFIDENCE: f64 = 0.9;

/// 业务规则安全校验
pub struct BusinessRuleOverride;

impl BusinessRuleOverride {
    /// 对 AI 判定重新套用商户硬性约束
    ///
    /// 单调性保证：本方法永远不会把不可用判定变成可用判定。
    pub fn apply(verdict: AiVerdict, item: &BasketItem, rules: &MerchantRules) -> AiVerdict {
        // 只检查 AI 放行的判定
        if !verdict.eligible {
            return verdict;
        }

        match Self::try_apply(&verdict, item, rules) {
            Ok(Some(overridden)) => {
                debug!(sku = %item.sku, reason = %overridden.reason, "商户硬性约束覆盖 AI 判定");
                overridden
            }
            Ok(None) => verdict,
            Err(e) => {
                warn!(sku = %item.sku, error = %e, "安全校验内部错误，降级为保守判定");
                AiVerdict {
                    eligible: false,
                    confidence: 0.0,
                    reason: format!("安全校验失败，保守判定为不可用: {}", e),
                    source: VerdictSource::Rules,
                    model_version: verdict.model_version,
                    created_at: Utc::now(),
                }
            }
        }
    }

    fn try_apply(
        verdict: &AiVerdict,
        item: &BasketItem,
        rules: &MerchantRules,
    ) -> Result<Option<AiVerdict>> {
        if item.contains_alcohol && rules.alcohol_prohibited {
            return Ok(Some(AiVerdict {
                eligible: false,
                confidence: verdict.confidence.max(ALCOHOL_OVERRIDE_MIN_CONFIDENCE),
                reason: "商户禁止酒精类商品，覆盖 AI 判定为不可用".to_string(),
                source: VerdictSource::Rules,
                model_version: verdict.model_version.clone(),
                created_at: Utc::now(),
            }));
        }

        if item.is_combo && item.contains_alcohol {
            if let Some(rule) = rules.alcohol_capped_rule() {
                if let (Some(cap), Some(abv)) = (rule.max_alcohol_percentage, item.alcohol_percentage)
                {
                    if !abv.is_finite() || !cap.is_finite() {
                        return Err(VoucherError::RuleEvaluationFailed(format!(
                            "酒精度数值无效: abv={}, cap={}",
                            abv, cap
                        )));
                    }
                    if abv > cap {
                        return Ok(Some(AiVerdict {
                            eligible: false,
                            confidence: 1.0,
                            reason: format!(
                                "套餐酒精度 {:.1}% 超过商户上限 {:.1}%，覆盖 AI 判定为不可用",
                                abv, cap
                            ),
                            source: VerdictSource::Rules,
                            model_version: verdict.model_version.clone(),
                            created_at: Utc::now(),
                        }));
                    }
                }
            }
        }

        Ok(None)
    }
}
