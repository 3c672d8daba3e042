//! 请求与响应 DTO

use serde::{Deserialize, Serialize};

use crate::models::{AncillaryFee, BasketItem, CategorizedItem};

/// 购物篮过滤请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketRequest {
    pub basket_id: String,
    pub merchant_id: String,
    pub currency: String,
    pub items: Vec<BasketItem>,
    #[serde(default)]
    pub fees: Vec<AncillaryFee>,
}

/// 购物篮过滤响应
///
/// 金额为十进制货币（两位小数），由最小货币单位在此边界一次性转换。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketFilteringResponse {
    pub basket_id: String,
    pub total_amount: f64,
    pub eligible_amount: f64,
    pub ineligible_amount: f64,
    pub currency: String,
    pub items: Vec<CategorizedItem>,
    pub excluded_fees: Vec<AncillaryFee>,
    pub fully_eligible: bool,
    pub ineligibility_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_fees_default_to_empty() {
        let json = r#"{
            "basket_id": "b-1",
            "merchant_id": "m-1",
            "currency": "EUR",
            "items": []
        }"#;

        let request: BasketRequest = serde_json::from_str(json).unwrap();
        assert!(request.fees.is_empty());
    }
}
