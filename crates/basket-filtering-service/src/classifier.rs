//! 商品可用性分类器
//!
//! 每个商品按严格顺序走级联回退链，首个成功的阶段即终态：
//! 目录命中（带 AI 判定）→ 目录命中（仅类目）→ 确定性规则 →
//! AI 分类（含安全校验）→ 错误兜底。
//!
//! 解析结果以显式的标签变体（`Resolution`）在单一有序函数链中传递，
//! 不使用嵌套空值判断。AI 判定会写回目录与缓存，使同一 SKU 的后续
//! 查询在第 1/2 步短路——这是系统的自强化学习回路。

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use voucher_shared::cache::{CacheKey, TieredCache};
use voucher_shared::error::Result;

use crate::ai::{AiClassifierAdapter, BusinessRuleOverride, ClassificationContext};
use crate::models::{
    AiVerdict, BasketItem, CatalogEntry, CategorizedItem, CountryRules, MerchantRules,
    NormalizedCategory, Provenance, ResolutionStage,
};
use crate::repository::CatalogStore;
use crate::rules::{ABSOLUTE_CONFIDENCE, RuleEngine, RuleOutcome, RuleVerdict};

/// 单个商品的解析结果
#[derive(Debug, Clone)]
enum Resolution {
    /// 目录命中且带缓存 AI 判定——判定具有权威性
    CatalogVerdict {
        verdict: AiVerdict,
        category: NormalizedCategory,
    },
    /// 目录命中但无判定，仅凭归一化类目推导
    CatalogCategory {
        category: NormalizedCategory,
        eligible: bool,
    },
    /// 确定性规则给出结论
    Rules(RuleVerdict),
    /// AI 分类（已经过安全校验）
    Ai {
        verdict: AiVerdict,
        category: NormalizedCategory,
    },
}

/// 商品可用性分类器
pub struct EligibilityClassifier {
    cache: TieredCache,
    catalog: Arc<dyn CatalogStore>,
    ai: AiClassifierAdapter,
}

impl EligibilityClassifier {
    pub fn new(
        cache: TieredCache,
        catalog: Arc<dyn CatalogStore>,
        ai: AiClassifierAdapter,
    ) -> Self {
        Self { cache, catalog, ai }
    }

    /// 分类单个商品
    ///
    /// 永不失败：解析链中任何未被吸收的错误都转换为该商品的
    /// 保守判定（不可用，类目 error），购物篮级流程不受影响。
    pub async fn classify_item(
        &self,
        item: &BasketItem,
        merchant_rules: &MerchantRules,
        country_rules: &CountryRules,
    ) -> CategorizedItem {
        let start = Instant::now();

        let categorized = match self.resolve(item, merchant_rules, country_rules).await {
            Ok(resolution) => Self::into_categorized(item, resolution, start),
            Err(e) => {
                warn!(sku = %item.sku, error = %e, "商品解析失败，保守判定为不可用");
                CategorizedItem {
                    item: item.clone(),
                    eligible: false,
                    reason: e.to_string(),
                    detected_category: "error".to_string(),
                    provenance: Provenance {
                        stage: ResolutionStage::Error,
                        confidence: 0.0,
                        latency_ms: start.elapsed().as_millis() as u64,
                    },
                }
            }
        };

        metrics::counter!(
            "item_classifications_total",
            "stage" => categorized.provenance.stage.as_str()
        )
        .increment(1);
        metrics::histogram!("item_classification_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        categorized
    }

    /// 级联回退链
    async fn resolve(
        &self,
        item: &BasketItem,
        merchant_rules: &MerchantRules,
        country_rules: &CountryRules,
    ) -> Result<Resolution> {
        // 第 1/2 步：目录查询（缓存优先）
        if let Some(entry) = self.lookup_catalog(&item.sku).await? {
            if let Some(verdict) = entry.ai_verdict {
                debug!(sku = %item.sku, "目录命中（带 AI 判定），直接返回");
                return Ok(Resolution::CatalogVerdict {
                    verdict: verdict.clamped(),
                    category: entry.category,
                });
            }
            debug!(sku = %item.sku, category = entry.category.as_str(), "目录命中（仅类目）");
            return Ok(Resolution::CatalogCategory {
                eligible: entry.category.is_eligible(),
                category: entry.category,
            });
        }

        // 第 3 步：确定性规则
        if let RuleOutcome::Definitive(verdict) = RuleEngine::evaluate(item, merchant_rules) {
            return Ok(Resolution::Rules(verdict));
        }

        // 第 4 步：AI 分类 + 安全校验
        let ctx = ClassificationContext {
            merchant_rules,
            country_rules,
        };
        let verdict = self.ai.classify_with_fallback(item, &ctx).await;
        let verdict = BusinessRuleOverride::apply(verdict, item, merchant_rules);
        let category = Self::derive_category(item, &verdict);

        // 第 5 步：写回目录与缓存，失败只记日志
        self.write_back(item, category, &verdict).await;

        Ok(Resolution::Ai { verdict, category })
    }

    /// 目录查询：先查分层缓存，未命中回源目录存储
    ///
    /// 存储命中会写回缓存；存储访问失败向上传播，
    /// 由兜底逻辑转换为该商品的保守判定。
    async fn lookup_catalog(&self, sku: &str) -> Result<Option<CatalogEntry>> {
        let key = CacheKey::catalog_entry(sku);

        if let Some(entry) = self.cache.get::<CatalogEntry>(&key).await {
            return Ok(Some(entry));
        }

        match self.catalog.get_by_sku(sku).await? {
            Some(entry) => {
                self.cache.set_default(&key, &entry).await;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// 由商品属性与判定推导归一化类目
    fn derive_category(item: &BasketItem, verdict: &AiVerdict) -> NormalizedCategory {
        if item.contains_alcohol {
            NormalizedCategory::Alcoholic
        } else if verdict.eligible {
            NormalizedCategory::Food
        } else {
            NormalizedCategory::Unknown
        }
    }

    /// 写回学习回路
    ///
    /// 同步写缓存保证同一购物篮内的重复 SKU 立即短路；
    /// 目录落盘失败只记日志，绝不向调用方传播。
    async fn write_back(
        &self,
        item: &BasketItem,
        category: NormalizedCategory,
        verdict: &AiVerdict,
    ) {
        let entry = CatalogEntry {
            sku: item.sku.clone(),
            category,
            ai_verdict: Some(verdict.clone()),
            updated_at: Utc::now(),
        };

        if let Err(e) = self.catalog.upsert(&entry).await {
            warn!(sku = %item.sku, error = %e, "目录写回失败");
        }

        self.cache
            .set_default(&CacheKey::catalog_entry(&item.sku), &entry)
            .await;

        debug!(sku = %item.sku, category = category.as_str(), "AI 判定已写回目录");
    }

    fn into_categorized(item: &BasketItem, resolution: Resolution, start: Instant) -> CategorizedItem {
        let latency_ms = start.elapsed().as_millis() as u64;

        match resolution {
            Resolution::CatalogVerdict { verdict, category } => CategorizedItem {
                item: item.clone(),
                eligible: verdict.eligible,
                reason: verdict.reason,
                detected_category: category.as_str().to_string(),
                provenance: Provenance {
                    stage: ResolutionStage::CatalogVerdict,
                    confidence: verdict.confidence,
                    latency_ms,
                },
            },
            Resolution::CatalogCategory { category, eligible } => CategorizedItem {
                item: item.clone(),
                eligible,
                reason: if eligible {
                    format!("目录类目 {} 可用餐饮券支付", category.as_str())
                } else {
                    format!("目录类目 {} 不可用餐饮券支付", category.as_str())
                },
                detected_category: category.as_str().to_string(),
                provenance: Provenance {
                    stage: ResolutionStage::CatalogCategory,
                    confidence: ABSOLUTE_CONFIDENCE,
                    latency_ms,
                },
            },
            Resolution::Rules(verdict) => CategorizedItem {
                item: item.clone(),
                eligible: verdict.eligible,
                reason: verdict.reason,
                detected_category: verdict.category,
                provenance: Provenance {
                    stage: ResolutionStage::Rules,
                    confidence: verdict.confidence,
                    latency_ms,
                },
            },
            Resolution::Ai { verdict, category } => CategorizedItem {
                item: item.clone(),
                eligible: verdict.eligible,
                reason: verdict.reason,
                detected_category: category.as_str().to_string(),
                provenance: Provenance {
                    stage: ResolutionStage::Ai,
                    confidence: verdict.confidence,
                    latency_ms,
                },
            },
        }
    }
}
