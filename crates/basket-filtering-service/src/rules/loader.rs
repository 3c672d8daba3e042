//! 商户规则加载器
//!
//! 规则可能被后台更新，因此内存副本带短 TTL（默认 5 分钟）。
//! 过期后自动重新拉取；拉取失败时若有过期副本则继续服务，保证可用性。
//! 副本以 Arc 形式分发，请求期间不可变——覆盖逻辑必须在自己的副本上操作。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use voucher_shared::error::Result;

use crate::models::MerchantRules;
use crate::repository::RulesStore;

/// 缓存的规则副本
struct CachedRules {
    rules: Arc<MerchantRules>,
    fetched_at: Instant,
}

/// 商户规则加载器
pub struct MerchantRulesLoader {
    store: Arc<dyn RulesStore>,
    entries: RwLock<HashMap<String, CachedRules>>,
    ttl: Duration,
}

impl MerchantRulesLoader {
    /// 创建加载器，默认 TTL 5 分钟
    pub fn new(store: Arc<dyn RulesStore>) -> Self {
        Self::with_ttl(store, Duration::from_secs(300))
    }

    /// 使用自定义 TTL 创建加载器
    pub fn with_ttl(store: Arc<dyn RulesStore>, ttl: Duration) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// 获取商户规则
    ///
    /// 副本未过期时直接返回；过期则重新拉取。
    /// 拉取失败时使用过期副本继续服务，没有副本才向上返回错误。
    pub async fn get(&self, merchant_id: &str) -> Result<Arc<MerchantRules>> {
        {
            let entries = self.entries.read().await;
            if let Some(cached) = entries.get(merchant_id) {
                if cached.fetched_at.elapsed() <= self.ttl {
                    return Ok(cached.rules.clone());
                }
            }
        }

        match self.refresh(merchant_id).await {
            Ok(rules) => Ok(rules),
            Err(e) => {
                let entries = self.entries.read().await;
                if let Some(cached) = entries.get(merchant_id) {
                    warn!(
                        merchant_id,
                        error = %e,
                        "刷新商户规则失败，使用过期副本继续服务"
                    );
                    Ok(cached.rules.clone())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// 强制重新拉取并更新副本
    pub async fn refresh(&self, merchant_id: &str) -> Result<Arc<MerchantRules>> {
        let start = Instant::now();
        let rules = Arc::new(self.store.merchant_rules(merchant_id).await?);

        let mut entries = self.entries.write().await;
        entries.insert(
            merchant_id.to_string(),
            CachedRules {
                rules: rules.clone(),
                fetched_at: Instant::now(),
            },
        );

        info!(
            merchant_id,
            rule_count = rules.category_rules.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "商户规则已刷新"
        );

        Ok(rules)
    }

    /// 手动使副本失效
    ///
    /// 规则变更时调用，强制下次查询时重新拉取
    pub async fn invalidate(&self, merchant_id: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(merchant_id);
        debug!(merchant_id, "商户规则副本已失效");
    }

    /// 预热
    ///
    /// 服务启动时为已知商户预拉取规则，避免首个请求的冷启动延迟
    pub async fn warmup(&self, merchant_ids: &[&str]) {
        for merchant_id in merchant_ids {
            if let Err(e) = self.refresh(merchant_id).await {
                warn!(merchant_id, error = %e, "商户规则预热失败");
            }
        }
    }
}
