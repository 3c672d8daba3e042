//! AI 分类适配器
//!
//! 将外部 AI 服务包装成可靠的分类调用：构造提示词、带退避重试、
//! 逐次调用超时、JSON 提取与钳制，以及置信度保守回退。
//!
//! ## 置信度硬规则
//!
//! 置信度 < 0.7 的 AI 输出永远不能批准消费：`classify_with_fallback`
//! 会将其覆盖为保守的不可用判定（固定置信度 0.5），原始理由保留为上下文。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use voucher_shared::config::AiConfig;
use voucher_shared::error::{Result, VoucherError};
use voucher_shared::retry::{RetryPolicy, retry_with_policy};

use crate::models::{
    AiVerdict, BasketItem, CONFIDENCE_TRUST_THRESHOLD, CountryRules, MerchantRules, VerdictSource,
};
use crate::repository::{AiCallParams, AiService};

/// 低置信度覆盖后的固定置信度
pub const LOW_CONFIDENCE_FALLBACK: f64 = 0.5;

/// 分类上下文：商户与国家规则的只读快照
pub struct ClassificationContext<'a> {
    pub merchant_rules: &'a MerchantRules,
    pub country_rules: &'a CountryRules,
}

/// AI 原始响应的 JSON 形状
#[derive(Debug, Deserialize)]
struct RawAiVerdict {
    #[serde(alias = "isEligible")]
    is_eligible: bool,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reason: String,
}

/// AI 分类适配器
pub struct AiClassifierAdapter {
    service: Arc<dyn AiService>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    params: AiCallParams,
}

impl AiClassifierAdapter {
    pub fn new(service: Arc<dyn AiService>, config: &AiConfig) -> Self {
        Self {
            service,
            policy: RetryPolicy::with_max_retries(config.max_retries),
            attempt_timeout: config.attempt_timeout(),
            params: AiCallParams {
                model: config.model.clone(),
                temperature: config.temperature,
            },
        }
    }

    /// 覆盖重试策略（测试中用于缩短退避时间）
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 构造紧凑的自然语言提示词
    ///
    /// 编码商品属性与国家级可用性规则，输出交由系统提示词约束为 JSON。
    fn build_prompt(item: &BasketItem, ctx: &ClassificationContext<'_>) -> String {
        let alcohol = if item.contains_alcohol {
            match item.alcohol_percentage {
                Some(abv) => format!("含酒精（{:.1}% vol）", abv),
                None => "含酒精".to_string(),
            }
        } else {
            "不含酒精".to_string()
        };

        format!(
            "商品: {name}\n描述: {description}\n申报类目: {category}\n{alcohol}，{combo}\n\
             国家: {country}\n国家规则: {guidance}\n\
             该商品是否可用餐饮券支付？",
            name = item.name,
            description = item.description,
            category = if item.category.is_empty() {
                "未申报"
            } else {
                item.category.as_str()
            },
            alcohol = alcohol,
            combo = if item.is_combo { "属于套餐" } else { "非套餐" },
            country = ctx.country_rules.country_code,
            guidance = ctx.country_rules.guidance,
        )
    }

    /// 从原始文本中提取并解析 JSON 判定
    ///
    /// 模型可能在 JSON 前后输出解释文字，按第一个 `{` 到最后一个 `}`
    /// 截取。解析失败属于可重试错误，由重试执行器统一处理。
    fn parse_verdict(raw: &str, model: &str) -> Result<AiVerdict> {
        if raw.trim().is_empty() {
            return Err(VoucherError::AiResponseMalformed("响应内容为空".to_string()));
        }

        let start = raw.find('{').ok_or_else(|| {
            VoucherError::AiResponseMalformed("响应中未找到 JSON 花括号".to_string())
        })?;
        let end = raw.rfind('}').ok_or_else(|| {
            VoucherError::AiResponseMalformed("响应中未找到 JSON 结束花括号".to_string())
        })?;
        if end < start {
            return Err(VoucherError::AiResponseMalformed(
                "JSON 花括号顺序错误".to_string(),
            ));
        }

        let parsed: RawAiVerdict = serde_json::from_str(&raw[start..=end])
            .map_err(|e| VoucherError::AiResponseMalformed(format!("JSON 解析失败: {}", e)))?;

        Ok(AiVerdict {
            eligible: parsed.is_eligible,
            confidence: parsed.confidence,
            reason: parsed.reason,
            source: VerdictSource::Ai,
            model_version: Some(model.to_string()),
            created_at: Utc::now(),
        }
        .clamped())
    }

    /// 调用外部服务并解析判定
    ///
    /// 网络故障、非 2xx、超时与格式错误都按退避策略重试；
    /// 重试预算耗尽后向调用方返回错误。
    pub async fn classify(
        &self,
        item: &BasketItem,
        ctx: &ClassificationContext<'_>,
    ) -> Result<AiVerdict> {
        let prompt = Self::build_prompt(item, ctx);
        metrics::counter!("ai_calls_total").increment(1);

        let service = self.service.clone();
        let params = self.params.clone();
        let attempt_timeout = self.attempt_timeout;

        let verdict = retry_with_policy(
            &self.policy,
            "ai_classify",
            VoucherError::is_retryable,
            || {
                let service = service.clone();
                let params = params.clone();
                let prompt = prompt.clone();
                async move {
                    let raw = match tokio::time::timeout(
                        attempt_timeout,
                        service.classify(&prompt, &params),
                    )
                    .await
                    {
                        Ok(result) => result?,
                        Err(_) => {
                            return Err(VoucherError::ExternalServiceTimeout {
                                service: "ai-classifier".to_string(),
                            });
                        }
                    };
                    Self::parse_verdict(&raw, &params.model)
                }
            },
        )
        .await?;

        debug!(
            sku = %item.sku,
            eligible = verdict.eligible,
            confidence = verdict.confidence,
            "AI 分类完成"
        );

        Ok(verdict)
    }

    /// 带保守回退的分类
    ///
    /// 两条回退路径：
    /// - 调用彻底失败（重试耗尽）→ 不可用，置信度 0.0；
    /// - 置信度 < 0.7 → 覆盖为不可用，固定置信度 0.5，保留原始理由。
    ///
    /// 本方法永不返回错误——低层故障到此为止。
    pub async fn classify_with_fallback(
        &self,
        item: &BasketItem,
        ctx: &ClassificationContext<'_>,
    ) -> AiVerdict {
        match self.classify(item, ctx).await {
            Ok(verdict) if verdict.confidence < CONFIDENCE_TRUST_THRESHOLD => {
                debug!(
                    sku = %item.sku,
                    confidence = verdict.confidence,
                    "AI 置信度不足，覆盖为保守判定"
                );
                AiVerdict {
                    eligible: false,
                    confidence: LOW_CONFIDENCE_FALLBACK,
                    reason: format!(
                        "AI 置信度不足（{:.2}），保守判定为不可用；原始理由: {}",
                        verdict.confidence, verdict.reason
                    ),
                    source: VerdictSource::Ai,
                    model_version: verdict.model_version,
                    created_at: Utc::now(),
                }
            }
            Ok(verdict) => verdict,
            Err(e) => {
                metrics::counter!("ai_fallbacks_total").increment(1);
                warn!(sku = %item.sku, error = %e, "AI 分类失败，使用保守回退判定");
                AiVerdict {
                    eligible: false,
                    confidence: 0.0,
                    reason: format!("AI 服务不可用: {}", e),
                    source: VerdictSource::Ai,
                    model_version: None,
                    created_at: Utc::now(),
                }
            }
        }
    }
}
