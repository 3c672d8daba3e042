//! 判定结果与溯源模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 判定可信阈值：置信度低于此值的判定一律视为不确定
pub const CONFIDENCE_TRUST_THRESHOLD: f64 = 0.7;

/// 判定来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictSource {
    Rules,
    Ai,
    Catalog,
    Manual,
}

impl VerdictSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::Ai => "ai",
            Self::Catalog => "catalog",
            Self::Manual => "manual",
        }
    }
}

/// AI 判定结果
///
/// confidence 是承重不变式：所有下游消费方必须将其钳制到 [0,1]，
/// 且无论上游给出什么值，< 0.7 一律按"不确定"处理。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiVerdict {
    pub eligible: bool,
    pub confidence: f64,
    pub reason: String,
    pub source: VerdictSource,
    #[serde(default)]
    pub model_version: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AiVerdict {
    /// 将置信度钳制到 [0,1]
    ///
    /// NaN 一律归零——无效数值不允许进入下游比较。
    pub fn clamped(mut self) -> Self {
        self.confidence = if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        };
        self
    }

    /// 置信度是否不足以信任
    pub fn is_uncertain(&self) -> bool {
        self.confidence < CONFIDENCE_TRUST_THRESHOLD
    }
}

/// 解析阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    /// 目录命中且带缓存 AI 判定
    CatalogVerdict,
    /// 目录命中但无判定，按归一化类目推导
    CatalogCategory,
    /// 确定性规则引擎给出结论
    Rules,
    /// AI 分类（含安全校验）
    Ai,
    /// 解析过程出错，保守判定
    Error,
}

impl ResolutionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CatalogVerdict => "catalog_verdict",
            Self::CatalogCategory => "catalog_category",
            Self::Rules => "rules",
            Self::Ai => "ai",
            Self::Error => "error",
        }
    }
}

/// 溯源记录
///
/// 固定结构：解析阶段 + 置信度 + 耗时，不使用无类型的元数据字典。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub stage: ResolutionStage,
    pub confidence: f64,
    pub latency_ms: u64,
}

/// 分类完成的商品
///
/// 输入商品加上判定结果、原因、识别类目与溯源信息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedItem {
    #[serde(flatten)]
    pub item: super::item::BasketItem,
    pub eligible: bool,
    pub reason: String,
    pub detected_category: String,
    pub provenance: Provenance,
}
