//! 规则引擎性能基准测试
//!
//! 测试覆盖：
//! - 单商品单规则评估性能
//! - 不同规则数量下的性能曲线
//! - 禁止关键词扫描性能（无规则命中时的最坏路径）

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use basket_filtering_service::models::{BasketItem, CategoryRule, MerchantRules};
use basket_filtering_service::rules::RuleEngine;

fn item(name: &str, category: &str) -> BasketItem {
    BasketItem {
        sku: "SKU-BENCH".to_string(),
        name: name.to_string(),
        description: "Plat du jour avec accompagnement".to_string(),
        category: category.to_string(),
        unit_price_minor: 1200,
        total_price_minor: 1200,
        currency: "EUR".to_string(),
        contains_alcohol: false,
        alcohol_percentage: None,
        is_combo: false,
    }
}

fn rules_with(count: usize) -> MerchantRules {
    let category_rules = (0..count)
        .map(|i| CategoryRule {
            category_id: format!("cat_{}", i),
            name: format!("Category {}", i),
            eligible: i % 2 == 0,
            keywords: vec![format!("keyword-{}", i)],
            excluded_keywords: vec![],
            max_alcohol_percentage: None,
            requires_food: false,
            immediate_consumption_only: false,
        })
        .collect();

    MerchantRules {
        merchant_id: "m-bench".to_string(),
        country_code: "FR".to_string(),
        daily_cap_minor: 2500,
        category_rules,
        allow_alcohol_in_combo: false,
        alcohol_prohibited: false,
        operating_window: None,
    }
}

fn bench_single_rule_match(c: &mut Criterion) {
    let rules = rules_with(1);
    let matching = item("Plat keyword-0 special", "");

    c.bench_function("evaluate_single_rule_match", |b| {
        b.iter(|| RuleEngine::evaluate(black_box(&matching), black_box(&rules)))
    });
}

fn bench_rule_count_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_rule_count");
    for count in [1usize, 10, 50, 200] {
        let rules = rules_with(count);
        // 命中最后一条规则，强制遍历整个列表
        let matching = item(&format!("Plat keyword-{} special", count - 1), "");

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| RuleEngine::evaluate(black_box(&matching), black_box(&rules)))
        });
    }
    group.finish();
}

fn bench_prohibited_keyword_scan(c: &mut Criterion) {
    let rules = rules_with(20);
    // 无规则命中，落到禁止关键词扫描
    let wine = item("Red Wine 750ml", "");

    c.bench_function("evaluate_prohibited_keyword_scan", |b| {
        b.iter(|| RuleEngine::evaluate(black_box(&wine), black_box(&rules)))
    });
}

criterion_group!(
    benches,
    bench_single_rule_match,
    bench_rule_count_scaling,
    bench_prohibited_keyword_scan
);
criterion_main!(benches);
