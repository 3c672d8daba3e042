//! 购物篮过滤端到端流程测试
//!
//! 使用内存存储与可编程 AI 服务驱动完整管线，
//! 覆盖目录短路、规则判定、费用排除、每日限额与缓存统计。

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use basket_filtering_service::ai::AiClassifierAdapter;
use basket_filtering_service::classifier::EligibilityClassifier;
use basket_filtering_service::dto::BasketRequest;
use basket_filtering_service::models::{
    AiVerdict, AncillaryFee, BasketItem, CatalogEntry, CategoryRule, CountryRules, FeeKind,
    MerchantRules, NormalizedCategory, ResolutionStage, VerdictSource,
};
use basket_filtering_service::repository::{
    AiCallParams, AiService, InMemoryAuditSink, InMemoryCatalogStore, InMemoryRulesStore,
};
use basket_filtering_service::rules::MerchantRulesLoader;
use basket_filtering_service::service::BasketFilteringService;
use voucher_shared::cache::TieredCache;
use voucher_shared::config::AiConfig;
use voucher_shared::retry::RetryPolicy;
use voucher_shared::test_utils::test_cache_config;

/// 统计调用次数的 AI 服务
struct CountingAiService {
    response: String,
    calls: AtomicU32,
}

impl CountingAiService {
    fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicU32::new(0),
        }
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiService for CountingAiService {
    async fn classify(
        &self,
        _prompt: &str,
        _params: &AiCallParams,
    ) -> voucher_shared::error::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

struct Harness {
    service: BasketFilteringService,
    catalog: Arc<InMemoryCatalogStore>,
    ai: Arc<CountingAiService>,
    #[allow(dead_code)]
    audit: Arc<InMemoryAuditSink>,
}

/// 默认商户：含 "Menu with Alcohol" 可用规则，限额 25.00
fn default_merchant_rules() -> MerchantRules {
    MerchantRules {
        merchant_id: "m-01".to_string(),
        country_code: "FR".to_string(),
        daily_cap_minor: 2500,
        category_rules: vec![CategoryRule {
            category_id: "menu_with_alcohol".to_string(),
            name: "Menu with Alcohol".to_string(),
            eligible: true,
            keywords: vec!["menu".to_string(), "formule".to_string()],
            excluded_keywords: vec![],
            max_alcohol_percentage: Some(9.0),
            requires_food: true,
            immediate_consumption_only: false,
        }],
        allow_alcohol_in_combo: true,
        alcohol_prohibited: false,
        operating_window: None,
    }
}

fn build_harness(ai_response: &str, merchant_rules: MerchantRules) -> Harness {
    let catalog = Arc::new(InMemoryCatalogStore::new());
    let rules_store = Arc::new(InMemoryRulesStore::new());
    rules_store.seed_merchant(merchant_rules);
    rules_store.seed_country(CountryRules {
        country_code: "FR".to_string(),
        guidance: "即食食品与套餐可用，酒精与非食品不可用".to_string(),
    });
    let audit = Arc::new(InMemoryAuditSink::new());
    let ai = Arc::new(CountingAiService::new(ai_response));

    let cache = TieredCache::new(&test_cache_config(), None);
    let adapter =
        AiClassifierAdapter::new(ai.clone(), &AiConfig::default()).with_policy(RetryPolicy {
            max_retries: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        });
    let classifier = Arc::new(EligibilityClassifier::new(
        cache.clone(),
        catalog.clone(),
        adapter,
    ));

    let service = BasketFilteringService::new(
        classifier,
        Arc::new(MerchantRulesLoader::new(rules_store.clone())),
        rules_store,
        audit.clone(),
        cache,
    );

    Harness {
        service,
        catalog,
        ai,
        audit,
    }
}

fn item(sku: &str, name: &str, total_minor: i64) -> BasketItem {
    BasketItem {
        sku: sku.to_string(),
        name: name.to_string(),
        description: String::new(),
        category: String::new(),
        unit_price_minor: total_minor,
        total_price_minor: total_minor,
        currency: "EUR".to_string(),
        contains_alcohol: false,
        alcohol_percentage: None,
        is_combo: false,
    }
}

fn request(items: Vec<BasketItem>, fees: Vec<AncillaryFee>) -> BasketRequest {
    BasketRequest {
        basket_id: "basket-e2e".to_string(),
        merchant_id: "m-01".to_string(),
        currency: "EUR".to_string(),
        items,
        fees,
    }
}

const AI_RESPONSE: &str = r#"{"isEligible": true, "confidence": 0.9, "reason": "即食食品"}"#;

/// 端到端场景：SKU A 目录命中（缓存判定 0.95），SKU B 命中
/// "Menu with Alcohol" 商户规则——两者可用，金额一致，完全可用，
/// AI 全程未被调用
#[tokio::test]
async fn test_end_to_end_catalog_and_rules() {
    let harness = build_harness(AI_RESPONSE, default_merchant_rules());
    harness.catalog.seed(CatalogEntry::with_verdict(
        "A",
        NormalizedCategory::Food,
        AiVerdict {
            eligible: true,
            confidence: 0.95,
            reason: "历史判定：即食食品".to_string(),
            source: VerdictSource::Catalog,
            model_version: None,
            created_at: Utc::now(),
        },
    ));

    let mut menu_item = item("B", "Lunch menu du jour", 1200);
    menu_item.category = "Menu with Alcohol".to_string();
    let response = harness
        .service
        .filter_basket(request(vec![item("A", "Pasta bowl", 800), menu_item], vec![]))
        .await
        .unwrap();

    assert!(response.items[0].eligible);
    assert_eq!(
        response.items[0].provenance.stage,
        ResolutionStage::CatalogVerdict
    );
    assert!(response.items[1].eligible);
    assert_eq!(response.items[1].provenance.stage, ResolutionStage::Rules);
    assert_eq!(response.items[1].detected_category, "Menu with Alcohol");

    assert!((response.total_amount - 20.0).abs() < 1e-9);
    assert!((response.eligible_amount - 20.0).abs() < 1e-9);
    assert!((response.ineligible_amount - 0.0).abs() < 1e-9);
    assert!(response.fully_eligible);
    assert!(response.ineligibility_reason.is_none());

    assert_eq!(harness.ai.call_count(), 0);
}

/// 禁止关键词：无目录、无规则命中的 "Red Wine 750ml"
/// 在规则阶段被判不可用（置信度 1.0），AI 不参与
#[tokio::test]
async fn test_prohibited_keyword_never_reaches_ai() {
    let harness = build_harness(AI_RESPONSE, default_merchant_rules());

    let response = harness
        .service
        .filter_basket(request(vec![item("W-1", "Red Wine 750ml", 1500)], vec![]))
        .await
        .unwrap();

    let wine = &response.items[0];
    assert!(!wine.eligible);
    assert_eq!(wine.provenance.stage, ResolutionStage::Rules);
    assert!((wine.provenance.confidence - 1.0).abs() < f64::EPSILON);
    assert_eq!(harness.ai.call_count(), 0);
    assert!(!response.fully_eligible);
}

/// 费用排除：全可用 10.00 商品 + 2.00 配送费
#[tokio::test]
async fn test_fee_exclusion_end_to_end() {
    let harness = build_harness(AI_RESPONSE, default_merchant_rules());
    harness.catalog.seed(CatalogEntry::new("F-1", NormalizedCategory::Food));

    let fees = vec![AncillaryFee {
        kind: FeeKind::Delivery,
        label: "配送费".to_string(),
        amount_minor: 200,
    }];
    let response = harness
        .service
        .filter_basket(request(vec![item("F-1", "Ramen bowl", 1000)], fees))
        .await
        .unwrap();

    assert!((response.eligible_amount - 10.0).abs() < 1e-9);
    assert!((response.ineligible_amount - 2.0).abs() < 1e-9);
    assert!(!response.fully_eligible);
    assert!(
        response
            .ineligibility_reason
            .as_ref()
            .unwrap()
            .contains("附加费用")
    );
    assert_eq!(response.excluded_fees.len(), 1);
}

/// 每日限额：可用 30.00、限额 25.00 → 恰好 25.00/5.00
#[tokio::test]
async fn test_daily_cap_end_to_end() {
    let harness = build_harness(AI_RESPONSE, default_merchant_rules());
    harness.catalog.seed(CatalogEntry::new("C-1", NormalizedCategory::Food));
    harness.catalog.seed(CatalogEntry::new("C-2", NormalizedCategory::Food));

    let response = harness
        .service
        .filter_basket(request(
            vec![item("C-1", "Family platter", 2000), item("C-2", "Dessert box", 1000)],
            vec![],
        ))
        .await
        .unwrap();

    assert!((response.eligible_amount - 25.0).abs() < 1e-9);
    assert!((response.ineligible_amount - 5.0).abs() < 1e-9);
    assert!(!response.fully_eligible);
    let reason = response.ineligibility_reason.unwrap();
    assert!(reason.contains("每日限额"));
    assert!(reason.contains("5.00"));
}

/// AI 学习回路：首篮调用 AI 并写回，次篮目录短路
#[tokio::test]
async fn test_learning_loop_across_baskets() {
    let harness = build_harness(AI_RESPONSE, default_merchant_rules());
    let novel = item("N-1", "Poke bowl saumon", 1300);

    let first = harness
        .service
        .filter_basket(request(vec![novel.clone()], vec![]))
        .await
        .unwrap();
    assert_eq!(first.items[0].provenance.stage, ResolutionStage::Ai);
    assert_eq!(harness.ai.call_count(), 1);

    let second = harness
        .service
        .filter_basket(request(vec![novel], vec![]))
        .await
        .unwrap();
    assert_eq!(
        second.items[0].provenance.stage,
        ResolutionStage::CatalogVerdict
    );
    assert_eq!(harness.ai.call_count(), 1);
}

/// 缓存统计核算：每次商品解析恰好一次 get，
/// total_hits + total_misses == get 次数且 total_hits == l1 + l2
#[tokio::test]
async fn test_cache_accounting_invariants() {
    let harness = build_harness(AI_RESPONSE, default_merchant_rules());
    harness.catalog.seed(CatalogEntry::new("A", NormalizedCategory::Food));

    let mut menu_item = item("B", "Lunch menu", 1200);
    menu_item.category = "Menu with Alcohol".to_string();

    // 两轮同样的购物篮：A 首轮缓存未命中（回源目录后写回），
    // 次轮 L1 命中；B 走规则判定，不写回，两轮都未命中
    for _ in 0..2 {
        harness
            .service
            .filter_basket(request(
                vec![item("A", "Pasta bowl", 800), menu_item.clone()],
                vec![],
            ))
            .await
            .unwrap();
    }

    let stats = harness.service.cache_statistics();
    assert_eq!(stats.total_hits + stats.total_misses, 4);
    assert_eq!(stats.total_hits, stats.l1_hits + stats.l2_hits);
    assert_eq!(stats.total_hits, 1);
    assert_eq!(stats.total_misses, 3);
}
