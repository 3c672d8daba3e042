//! 购物篮级结果聚合
//!
//! 对逐商品判定做金额汇总：可用/不可用金额分开累计，
//! 附加费用一律排除在可用金额之外，每日限额在逐项汇总之后统一套用。
//! 金额全程使用最小货币单位，十进制转换只在响应边界发生一次。

use std::collections::BTreeSet;

use crate::models::{AncillaryFee, CategorizedItem, MerchantRules};

/// 最小货币单位转十进制金额（两位小数）
pub fn minor_to_decimal(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// 最小货币单位格式化为两位小数字符串
pub fn format_minor(minor: i64) -> String {
    format!("{}.{:02}", minor / 100, (minor % 100).abs())
}

/// 聚合结果
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedBasket {
    /// 商品 + 附加费用总额（最小货币单位）
    pub total_minor: i64,
    pub eligible_minor: i64,
    pub ineligible_minor: i64,
    pub fully_eligible: bool,
    pub ineligibility_reason: Option<String>,
}

/// 购物篮聚合器
pub struct ResponseAggregator;

impl ResponseAggregator {
    /// 聚合逐商品判定
    ///
    /// 原因选取优先级（非完全可用时）：
    /// 1. 没有可用商品；
    /// 2. 既有不可用商品又有附加费用（合并描述）；
    /// 3. 仅有不可用商品（列出去重后的类目）；
    /// 4. 仅有附加费用；
    /// 5. 超出每日限额——最后计算并覆盖以上全部。
    pub fn aggregate(
        items: &[CategorizedItem],
        fees: &[AncillaryFee],
        rules: &MerchantRules,
    ) -> AggregatedBasket {
        let mut eligible_minor: i64 = 0;
        let mut ineligible_minor: i64 = 0;

        for item in items {
            if item.eligible {
                eligible_minor += item.item.total_price_minor;
            } else {
                ineligible_minor += item.item.total_price_minor;
            }
        }

        let fee_minor: i64 = fees.iter().map(|f| f.amount_minor).sum();
        // 附加费用永远不可用，直接计入不可用金额
        ineligible_minor += fee_minor;

        let total_minor = eligible_minor + ineligible_minor;

        let has_eligible = items.iter().any(|i| i.eligible);
        let has_ineligible = items.iter().any(|i| !i.eligible);

        let mut reason = if !items.is_empty() && !has_eligible {
            Some("购物篮中没有可用餐饮券支付的商品".to_string())
        } else if has_ineligible && fee_minor > 0 {
            Some(format!(
                "部分商品不可用餐饮券支付（类目: {}），附加费用 {} 亦不计入可用金额",
                Self::distinct_ineligible_categories(items).join("、"),
                format_minor(fee_minor)
            ))
        } else if has_ineligible {
            Some(format!(
                "部分商品不可用餐饮券支付（类目: {}）",
                Self::distinct_ineligible_categories(items).join("、")
            ))
        } else if fee_minor > 0 {
            Some(format!(
                "附加费用 {} 不可用餐饮券支付，已从可用金额中排除",
                format_minor(fee_minor)
            ))
        } else {
            None
        };

        // 每日限额在逐项汇总之后统一套用，超出部分移入不可用金额
        if eligible_minor > rules.daily_cap_minor {
            let excess = eligible_minor - rules.daily_cap_minor;
            eligible_minor = rules.daily_cap_minor;
            ineligible_minor += excess;
            reason = Some(format!("可用金额超出每日限额 {}", format_minor(excess)));
        }

        AggregatedBasket {
            total_minor,
            eligible_minor,
            ineligible_minor,
            fully_eligible: reason.is_none(),
            ineligibility_reason: reason,
        }
    }

    /// 不可用商品的去重类目列表（按字典序稳定输出）
    fn distinct_ineligible_categories(items: &[CategorizedItem]) -> Vec<String> {
        items
            .iter()
            .filter(|i| !i.eligible)
            .map(|i| i.detected_category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BasketItem, FeeKind, Provenance, ResolutionStage};

    fn categorized(sku: &str, total_minor: i64, eligible: bool, category: &str) -> CategorizedItem {
        CategorizedItem {
            item: BasketItem {
                sku: sku.to_string(),
                name: sku.to_string(),
                description: String::new(),
                category: String::new(),
                unit_price_minor: total_minor,
                total_price_minor: total_minor,
                currency: "EUR".to_string(),
                contains_alcohol: false,
                alcohol_percentage: None,
                is_combo: false,
            },
            eligible,
            reason: String::new(),
            detected_category: category.to_string(),
            provenance: Provenance {
                stage: ResolutionStage::Rules,
                confidence: 0.95,
                latency_ms: 1,
            },
        }
    }

    fn delivery_fee(amount_minor: i64) -> AncillaryFee {
        AncillaryFee {
            kind: FeeKind::Delivery,
            label: "配送费".to_string(),
            amount_minor,
        }
    }

    fn merchant(cap_minor: i64) -> MerchantRules {
        MerchantRules {
            merchant_id: "m-01".to_string(),
            country_code: "FR".to_string(),
            daily_cap_minor: cap_minor,
            category_rules: vec![],
            allow_alcohol_in_combo: false,
            alcohol_prohibited: false,
            operating_window: None,
        }
    }

    #[test]
    fn test_format_minor() {
        assert_eq!(format_minor(500), "5.00");
        assert_eq!(format_minor(2505), "25.05");
        assert_eq!(format_minor(9), "0.09");
    }

    /// 全部可用、无费用、未超限 → 完全可用，无原因
    #[test]
    fn test_fully_eligible_basket() {
        let items = vec![
            categorized("A", 1000, true, "food"),
            categorized("B", 500, true, "food"),
        ];

        let result = ResponseAggregator::aggregate(&items, &[], &merchant(2500));

        assert_eq!(result.eligible_minor, 1500);
        assert_eq!(result.ineligible_minor, 0);
        assert_eq!(result.total_minor, 1500);
        assert!(result.fully_eligible);
        assert!(result.ineligibility_reason.is_none());
    }

    /// 限额算术：可用 30.00、限额 25.00 → 可用恰为 25.00，
    /// 不可用增加恰为 5.00，原因标明超出 5.00
    #[test]
    fn test_daily_cap_arithmetic() {
        let items = vec![
            categorized("A", 2000, true, "food"),
            categorized("B", 1000, true, "food"),
        ];

        let result = ResponseAggregator::aggregate(&items, &[], &merchant(2500));

        assert_eq!(result.eligible_minor, 2500);
        assert_eq!(result.ineligible_minor, 500);
        assert!(!result.fully_eligible);
        assert!(
            result
                .ineligibility_reason
                .as_ref()
                .unwrap()
                .contains("5.00")
        );
    }

    /// 费用排除：全可用 10.00 商品 + 2.00 配送费 →
    /// 可用 10.00、不可用 2.00、非完全可用、原因提到附加费用
    #[test]
    fn test_fee_exclusion() {
        let items = vec![categorized("A", 1000, true, "food")];
        let fees = vec![delivery_fee(200)];

        let result = ResponseAggregator::aggregate(&items, &fees, &merchant(2500));

        assert_eq!(result.eligible_minor, 1000);
        assert_eq!(result.ineligible_minor, 200);
        assert_eq!(result.total_minor, 1200);
        assert!(!result.fully_eligible);
        assert!(
            result
                .ineligibility_reason
                .as_ref()
                .unwrap()
                .contains("附加费用")
        );
    }

    /// 没有可用商品时的原因优先级最高（限额除外）
    #[test]
    fn test_no_eligible_items_reason() {
        let items = vec![
            categorized("A", 1000, false, "alcoholic"),
            categorized("B", 500, false, "non_food"),
        ];
        let fees = vec![delivery_fee(200)];

        let result = ResponseAggregator::aggregate(&items, &fees, &merchant(2500));

        assert_eq!(result.eligible_minor, 0);
        assert_eq!(result.ineligible_minor, 1700);
        assert!(!result.fully_eligible);
        assert_eq!(
            result.ineligibility_reason.as_deref(),
            Some("购物篮中没有可用餐饮券支付的商品")
        );
    }

    /// 不可用商品 + 费用 → 合并原因
    #[test]
    fn test_combined_reason_items_and_fees() {
        let items = vec![
            categorized("A", 1000, true, "food"),
            categorized("B", 800, false, "alcoholic"),
        ];
        let fees = vec![delivery_fee(150)];

        let result = ResponseAggregator::aggregate(&items, &fees, &merchant(2500));

        let reason = result.ineligibility_reason.unwrap();
        assert!(reason.contains("alcoholic"));
        assert!(reason.contains("1.50"));
    }

    /// 仅不可用商品 → 去重后的类目列表
    #[test]
    fn test_distinct_categories_reason() {
        let items = vec![
            categorized("A", 1000, true, "food"),
            categorized("B", 800, false, "alcoholic"),
            categorized("C", 300, false, "alcoholic"),
            categorized("D", 200, false, "non_food"),
        ];

        let result = ResponseAggregator::aggregate(&items, &[], &merchant(2500));

        let reason = result.ineligibility_reason.unwrap();
        // 类目去重：alcoholic 只出现一次
        assert_eq!(reason.matches("alcoholic").count(), 1);
        assert!(reason.contains("non_food"));
    }

    /// 限额原因覆盖其他所有原因
    #[test]
    fn test_cap_reason_overrides_others() {
        let items = vec![
            categorized("A", 3000, true, "food"),
            categorized("B", 800, false, "alcoholic"),
        ];
        let fees = vec![delivery_fee(200)];

        let result = ResponseAggregator::aggregate(&items, &fees, &merchant(2500));

        assert_eq!(result.eligible_minor, 2500);
        // 不可用 = 商品 800 + 费用 200 + 超限 500
        assert_eq!(result.ineligible_minor, 1500);
        let reason = result.ineligibility_reason.unwrap();
        assert!(reason.contains("每日限额"));
        assert!(reason.contains("5.00"));
    }

    /// 空购物篮（无商品无费用）视为完全可用
    #[test]
    fn test_empty_basket() {
        let result = ResponseAggregator::aggregate(&[], &[], &merchant(2500));
        assert!(result.fully_eligible);
        assert_eq!(result.total_minor, 0);
    }
}
