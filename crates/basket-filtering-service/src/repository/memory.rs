//! 内存协作方实现
//!
//! 使用 DashMap 实现的高并发内存存储，适用于测试和开发环境。
//! 生产环境应替换为文档数据库实现。

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use voucher_shared::error::{Result, VoucherError};

use crate::dto::{BasketFilteringResponse, BasketRequest};
use crate::models::{CatalogEntry, CountryRules, MerchantRules};

use super::traits::{AuditSink, CatalogStore, RulesStore};

/// 内存目录存储
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalogStore {
    entries: Arc<DashMap<String, CatalogEntry>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置目录条目（测试/开发数据）
    pub fn seed(&self, entry: CatalogEntry) {
        self.entries.insert(entry.sku.clone(), entry);
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get_by_sku(&self, sku: &str) -> Result<Option<CatalogEntry>> {
        Ok(self.entries.get(sku).map(|e| e.clone()))
    }

    async fn upsert(&self, entry: &CatalogEntry) -> Result<()> {
        self.entries.insert(entry.sku.clone(), entry.clone());
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

/// 内存规则存储
#[derive(Debug, Default, Clone)]
pub struct InMemoryRulesStore {
    merchants: Arc<DashMap<String, MerchantRules>>,
    countries: Arc<DashMap<String, CountryRules>>,
}

impl InMemoryRulesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_merchant(&self, rules: MerchantRules) {
        self.merchants.insert(rules.merchant_id.clone(), rules);
    }

    pub fn seed_country(&self, rules: CountryRules) {
        self.countries.insert(rules.country_code.clone(), rules);
    }
}

#[async_trait]
impl RulesStore for InMemoryRulesStore {
    async fn merchant_rules(&self, merchant_id: &str) -> Result<MerchantRules> {
        self.merchants
            .get(merchant_id)
            .map(|r| r.clone())
            .ok_or_else(|| VoucherError::MerchantRulesNotFound {
                merchant_id: merchant_id.to_string(),
            })
    }

    async fn country_rules(&self, country_code: &str) -> Result<CountryRules> {
        self.countries
            .get(country_code)
            .map(|r| r.clone())
            .ok_or_else(|| VoucherError::NotFound {
                entity: "CountryRules".to_string(),
                id: country_code.to_string(),
            })
    }
}

/// 审计记录摘要
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub basket_id: String,
    pub fully_eligible: bool,
    pub eligible_amount: f64,
}

/// 内存审计落盘
///
/// 记录请求/响应摘要，供测试断言审计副作用。
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditSink {
    records: Arc<DashMap<String, AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, basket_id: &str) -> Option<AuditRecord> {
        self.records.get(basket_id).map(|r| r.clone())
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record_transaction(
        &self,
        request: &BasketRequest,
        response: &BasketFilteringResponse,
    ) -> Result<()> {
        self.records.insert(
            request.basket_id.clone(),
            AuditRecord {
                basket_id: request.basket_id.clone(),
                fully_eligible: response.fully_eligible,
                eligible_amount: response.eligible_amount,
            },
        );
        Ok(())
    }
}
