//! 商品目录模型
//!
//! 目录是 SKU 索引的学习型存储：首次 AI 分类或批量导入时创建条目，
//! 每次产生新的 AI 判定都会更新，只有显式清空目录才会删除。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::verdict::AiVerdict;

/// 归一化类目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedCategory {
    Food,
    Beverage,
    Alcoholic,
    NonFood,
    Unknown,
}

impl NormalizedCategory {
    /// 仅凭类目推导可用性：酒精类与非食品类不可用，其余可用
    pub fn is_eligible(&self) -> bool {
        !matches!(self, Self::Alcoholic | Self::NonFood)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Beverage => "beverage",
            Self::Alcoholic => "alcoholic",
            Self::NonFood => "non_food",
            Self::Unknown => "unknown",
        }
    }
}

/// 目录条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub sku: String,
    pub category: NormalizedCategory,
    /// 缓存的 AI 判定，存在时对后续查询具有权威性
    #[serde(default)]
    pub ai_verdict: Option<AiVerdict>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn new(sku: impl Into<String>, category: NormalizedCategory) -> Self {
        Self {
            sku: sku.into(),
            category,
            ai_verdict: None,
            updated_at: Utc::now(),
        }
    }

    /// 附带 AI 判定构造条目（写回路径使用）
    pub fn with_verdict(
        sku: impl Into<String>,
        category: NormalizedCategory,
        verdict: AiVerdict,
    ) -> Self {
        Self {
            sku: sku.into(),
            category,
            ai_verdict: Some(verdict),
            updated_at: Utc::now(),
        }
    }
}
