//! 协作方接口定义
//!
//! 核心只依赖这些抽象：目录存储、规则存储、外部 AI 服务与审计落盘。
//! 具体实现（文档数据库、HTTP 服务商）由部署方注入，便于 mock 测试。

use async_trait::async_trait;

use voucher_shared::error::Result;

use crate::dto::{BasketFilteringResponse, BasketRequest};
use crate::models::{CatalogEntry, CountryRules, MerchantRules};

/// 商品目录存储接口
///
/// SKU 索引的学习型存储，AI 判定写回的落点。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_by_sku(&self, sku: &str) -> Result<Option<CatalogEntry>>;
    async fn upsert(&self, entry: &CatalogEntry) -> Result<()>;
    /// 清空目录（仅显式目录清理操作调用）
    async fn delete_all(&self) -> Result<()>;
}

/// 规则存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RulesStore: Send + Sync {
    async fn merchant_rules(&self, merchant_id: &str) -> Result<MerchantRules>;
    async fn country_rules(&self, country_code: &str) -> Result<CountryRules>;
}

/// AI 调用参数
#[derive(Debug, Clone)]
pub struct AiCallParams {
    pub model: String,
    pub temperature: f64,
}

/// 外部 AI 分类服务接口
///
/// 返回原始文本响应，JSON 提取与解析由适配器负责。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AiService: Send + Sync {
    async fn classify(&self, prompt: &str, params: &AiCallParams) -> Result<String>;
}

/// 审计落盘接口（fire-and-forget）
///
/// 记录失败只影响审计完整性，绝不影响过滤响应。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_transaction(
        &self,
        request: &BasketRequest,
        response: &BasketFilteringResponse,
    ) -> Result<()>;
}
