//! 商户规则与国家规则模型
//!
//! 规则由规则存储拥有，对核心只读；请求期间的规则快照不可变，
//! 任何覆盖逻辑都在副本上操作。

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use voucher_shared::error::VoucherError;

use super::item::BasketItem;

/// 含酒精套餐规则的固定类目 ID
///
/// 安全校验按此 ID 定位商户的酒精度上限规则。
pub const ALCOHOL_COMBO_CATEGORY_ID: &str = "menu_with_alcohol";

/// 类目规则
///
/// 关键词匹配为不区分大小写的子串匹配，目标文本是商品名称 + 描述；
/// 排除关键词命中时整条规则不适用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category_id: String,
    pub name: String,
    /// 命中该规则的商品是否可用餐饮券支付
    pub eligible: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub excluded_keywords: Vec<String>,
    /// 酒精度上限（体积百分比），超过则不可用
    #[serde(default)]
    pub max_alcohol_percentage: Option<f64>,
    /// 是否要求搭配食品
    #[serde(default)]
    pub requires_food: bool,
    /// 是否仅限即时消费
    #[serde(default)]
    pub immediate_consumption_only: bool,
}

impl CategoryRule {
    /// 规则是否命中商品
    ///
    /// 命中条件：规则名等于商品申报类目（不区分大小写），
    /// 或任一关键词子串匹配名称+描述。排除关键词有一票否决权。
    pub fn matches(&self, item: &BasketItem) -> bool {
        let text = item.searchable_text();

        if self
            .excluded_keywords
            .iter()
            .any(|kw| text.contains(&kw.to_lowercase()))
        {
            return false;
        }

        if !item.category.is_empty()
            && self.name.to_lowercase() == item.category.to_lowercase()
        {
            return true;
        }

        self.keywords.iter().any(|kw| text.contains(&kw.to_lowercase()))
    }
}

/// 营业时段
///
/// 结构化的星期集合 + 起止时刻，构造时校验，不经过字符串往返。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OperatingWindowRepr", into = "OperatingWindowRepr")]
pub struct OperatingWindow {
    days: Vec<Weekday>,
    start: NaiveTime,
    end: NaiveTime,
}

/// 序列化表示，经 TryFrom 校验后才能得到 OperatingWindow
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OperatingWindowRepr {
    days: Vec<Weekday>,
    start: NaiveTime,
    end: NaiveTime,
}

impl TryFrom<OperatingWindowRepr> for OperatingWindow {
    type Error = VoucherError;

    fn try_from(repr: OperatingWindowRepr) -> Result<Self, Self::Error> {
        OperatingWindow::new(repr.days, repr.start, repr.end)
    }
}

impl From<OperatingWindow> for OperatingWindowRepr {
    fn from(window: OperatingWindow) -> Self {
        Self {
            days: window.days,
            start: window.start,
            end: window.end,
        }
    }
}

impl OperatingWindow {
    /// 构造营业时段，起始时刻必须早于结束时刻
    pub fn new(
        days: Vec<Weekday>,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Self, VoucherError> {
        if days.is_empty() {
            return Err(VoucherError::InvalidOperatingWindow(
                "星期集合不能为空".to_string(),
            ));
        }
        if start >= end {
            return Err(VoucherError::InvalidOperatingWindow(format!(
                "起始时刻 {} 必须早于结束时刻 {}",
                start, end
            )));
        }
        Ok(Self { days, start, end })
    }

    /// 指定时间点是否落在营业时段内
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let time = at.time();
        self.days.contains(&at.weekday()) && time >= self.start && time < self.end
    }
}

/// 商户规则
///
/// 每日限额与金额一致使用最小货币单位。规则列表有序，先匹配者生效。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantRules {
    pub merchant_id: String,
    pub country_code: String,
    /// 每日可用限额（最小货币单位）
    pub daily_cap_minor: i64,
    pub category_rules: Vec<CategoryRule>,
    /// 是否允许套餐中含酒精
    #[serde(default)]
    pub allow_alcohol_in_combo: bool,
    /// 是否完全禁止酒精类商品
    #[serde(default)]
    pub alcohol_prohibited: bool,
    #[serde(default)]
    pub operating_window: Option<OperatingWindow>,
}

impl MerchantRules {
    /// 按固定类目 ID 定位酒精度上限规则
    pub fn alcohol_capped_rule(&self) -> Option<&CategoryRule> {
        self.category_rules
            .iter()
            .find(|rule| rule.category_id == ALCOHOL_COMBO_CATEGORY_ID)
    }
}

/// 国家规则
///
/// 提供给 AI 提示词的国家级可用性指引文本。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRules {
    pub country_code: String,
    pub guidance: String,
}
