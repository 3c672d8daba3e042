//! 购物篮商品与附加费用模型

use serde::{Deserialize, Serialize};

/// 购物篮商品条目
///
/// 分类流程的不可变输入。金额一律使用最小货币单位（整数），
/// 十进制转换只在响应边界发生一次。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketItem {
    /// 商品 SKU，目录与缓存的主键
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 商户申报的类目名
    #[serde(default)]
    pub category: String,
    /// 单价（最小货币单位）
    pub unit_price_minor: i64,
    /// 行总价（最小货币单位）
    pub total_price_minor: i64,
    pub currency: String,
    /// 是否含酒精
    #[serde(default)]
    pub contains_alcohol: bool,
    /// 酒精度（体积百分比）
    #[serde(default)]
    pub alcohol_percentage: Option<f64>,
    /// 是否为套餐成员
    #[serde(default)]
    pub is_combo: bool,
}

impl BasketItem {
    /// 关键词匹配使用的文本：名称 + 描述，统一小写
    ///
    /// 规则引擎与绝对禁止关键词都以此文本做不区分大小写的子串匹配。
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.name, self.description).to_lowercase()
    }
}

/// 附加费用种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    Delivery,
    Service,
    Packaging,
}

impl FeeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Service => "service",
            Self::Packaging => "packaging",
        }
    }
}

/// 附加费用（配送费、服务费、包装费）
///
/// 无论商品判定结果如何，附加费用永远不计入可用餐饮券金额。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncillaryFee {
    pub kind: FeeKind,
    pub label: String,
    /// 费用金额（最小货币单位）
    pub amount_minor: i64,
}
