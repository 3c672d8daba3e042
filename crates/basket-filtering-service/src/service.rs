//! 购物篮过滤服务门面
//!
//! 调用方消费的唯一入口：加载商户/国家规则，把所有商品并发派发给
//! 分类器（输出顺序与输入一致），聚合金额与原因，审计落盘为
//! fire-and-forget 后台任务。

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{info, warn};

use voucher_shared::cache::{CacheStatistics, TieredCache};

use crate::aggregator::{ResponseAggregator, minor_to_decimal};
use crate::classifier::EligibilityClassifier;
use crate::dto::{BasketFilteringResponse, BasketRequest};
use crate::error::{FilteringError, Result};
use crate::repository::{AuditSink, RulesStore};
use crate::rules::MerchantRulesLoader;

/// 购物篮过滤服务
pub struct BasketFilteringService {
    classifier: Arc<EligibilityClassifier>,
    rules_loader: Arc<MerchantRulesLoader>,
    rules_store: Arc<dyn RulesStore>,
    audit: Arc<dyn AuditSink>,
    cache: TieredCache,
}

impl BasketFilteringService {
    pub fn new(
        classifier: Arc<EligibilityClassifier>,
        rules_loader: Arc<MerchantRulesLoader>,
        rules_store: Arc<dyn RulesStore>,
        audit: Arc<dyn AuditSink>,
        cache: TieredCache,
    ) -> Self {
        Self {
            classifier,
            rules_loader,
            rules_store,
            audit,
            cache,
        }
    }

    /// 过滤购物篮
    ///
    /// 商品间相互独立，全部并发解析；聚合器等待所有商品完成。
    /// 只要请求本身合法，响应一定会产生——单个商品的故障
    /// 已在分类器内部转换为该商品的保守判定。
    pub async fn filter_basket(&self, request: BasketRequest) -> Result<BasketFilteringResponse> {
        let start = Instant::now();
        info!(
            basket_id = %request.basket_id,
            merchant_id = %request.merchant_id,
            item_count = request.items.len(),
            "开始过滤购物篮"
        );

        let merchant_rules = self
            .rules_loader
            .get(&request.merchant_id)
            .await
            .map_err(|e| FilteringError::RulesUnavailable(e.to_string()))?;

        let country_rules = self
            .rules_store
            .country_rules(&merchant_rules.country_code)
            .await
            .map_err(|e| FilteringError::CountryRulesUnavailable {
                country_code: merchant_rules.country_code.clone(),
                message: e.to_string(),
            })?;

        // 并发解析所有商品；join_all 保证结果顺序与输入一致
        let futures = request
            .items
            .iter()
            .map(|item| self.classifier.classify_item(item, &merchant_rules, &country_rules));
        let categorized = join_all(futures).await;

        let aggregated = ResponseAggregator::aggregate(&categorized, &request.fees, &merchant_rules);

        let response = BasketFilteringResponse {
            basket_id: request.basket_id.clone(),
            total_amount: minor_to_decimal(aggregated.total_minor),
            eligible_amount: minor_to_decimal(aggregated.eligible_minor),
            ineligible_amount: minor_to_decimal(aggregated.ineligible_minor),
            currency: request.currency.clone(),
            items: categorized,
            excluded_fees: request.fees.clone(),
            fully_eligible: aggregated.fully_eligible,
            ineligibility_reason: aggregated.ineligibility_reason,
        };

        // 审计落盘不阻塞响应，失败只记日志
        let audit = self.audit.clone();
        let audit_request = request;
        let audit_response = response.clone();
        tokio::spawn(async move {
            if let Err(e) = audit.record_transaction(&audit_request, &audit_response).await {
                warn!(basket_id = %audit_request.basket_id, error = %e, "审计落盘失败");
            }
        });

        metrics::counter!("baskets_filtered_total").increment(1);
        info!(
            basket_id = %response.basket_id,
            eligible_amount = response.eligible_amount,
            ineligible_amount = response.ineligible_amount,
            fully_eligible = response.fully_eligible,
            duration_ms = start.elapsed().as_millis() as u64,
            "购物篮过滤完成"
        );

        Ok(response)
    }

    /// 缓存统计快照
    pub fn cache_statistics(&self) -> CacheStatistics {
        self.cache.stats()
    }

    /// 清空缓存并重置统计
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}
