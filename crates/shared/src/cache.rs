//! 分层缓存模块
//!
//! 两级键值缓存：L1 为进程内缓存（moka，按字节预算估算大小并淘汰，
//! 条目各自携带 TTL），L2 为共享 Redis 缓存。L2 命中会被提升到 L1，
//! 写入时 L1 同步、L2 异步，两层使用各自的默认 TTL。
//!
//! ## 失败策略
//!
//! 远端层的读写失败只记录日志并按未命中/空操作处理，绝不让调用方失败；
//! 序列化失败同样被吞掉。缓存是加速层，不是正确性依赖。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use moka::Expiry;
use moka::future::Cache as LocalCache;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::config::{CacheConfig, RedisConfig};
use crate::error::{Result, VoucherError};

// ---------------------------------------------------------------------------
// 缓存统计
// ---------------------------------------------------------------------------

/// 缓存统计快照
///
/// 计数器单调递增，只有显式 clear 会重置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub total_hits: u64,
    pub l1_hits: u64,
    pub l2_hits: u64,
    pub total_misses: u64,
    pub last_reset: DateTime<Utc>,
}

/// 内部计数器
///
/// 每次 get 恰好更新一个计数器（某个命中计数器或未命中计数器），
/// 并发场景下使用原子自增。
struct CacheCounters {
    l1_hits: AtomicU64,
    l2_hits: AtomicU64,
    misses: AtomicU64,
    last_reset: parking_lot::RwLock<DateTime<Utc>>,
}

impl CacheCounters {
    fn new() -> Self {
        Self {
            l1_hits: AtomicU64::new(0),
            l2_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            last_reset: parking_lot::RwLock::new(Utc::now()),
        }
    }

    fn record_l1_hit(&self) {
        self.l1_hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("cache_hits_total", "tier" => "l1").increment(1);
    }

    fn record_l2_hit(&self) {
        self.l2_hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("cache_hits_total", "tier" => "l2").increment(1);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("cache_misses_total").increment(1);
    }

    fn snapshot(&self) -> CacheStatistics {
        // 持读锁期间读取各计数器，保证与 reset 的写锁互斥
        let last_reset = *self.last_reset.read();
        let l1 = self.l1_hits.load(Ordering::Relaxed);
        let l2 = self.l2_hits.load(Ordering::Relaxed);
        CacheStatistics {
            total_hits: l1 + l2,
            l1_hits: l1,
            l2_hits: l2,
            total_misses: self.misses.load(Ordering::Relaxed),
            last_reset,
        }
    }

    fn reset(&self) {
        // 写锁覆盖全部清零操作，使 reset 对 snapshot 表现为原子
        let mut last_reset = self.last_reset.write();
        self.l1_hits.store(0, Ordering::Relaxed);
        self.l2_hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        *last_reset = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// RemoteCache — L2 共享缓存（Redis）
// ---------------------------------------------------------------------------

/// Redis 缓存客户端
#[derive(Clone)]
pub struct RemoteCache {
    client: Client,
}

impl RemoteCache {
    /// 创建 Redis 客户端
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self { client })
    }

    /// 获取连接
    async fn conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(VoucherError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(VoucherError::from)
    }

    /// 读取序列化后的负载
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    /// 写入序列化后的负载并设置 TTL
    pub async fn set_raw(&self, key: &str, payload: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.set_ex(key, payload, ttl.as_secs()).await?;
        Ok(())
    }

    /// 删除键
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    /// 批量删除（按模式）
    pub async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.conn().await?;
        let keys: Vec<String> = conn.keys(pattern).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let count: u64 = conn.del(keys).await?;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// TieredCache — L1 + L2 分层缓存
// ---------------------------------------------------------------------------

/// L1 条目：序列化负载 + 条目级 TTL
#[derive(Clone)]
struct L1Entry {
    payload: Arc<str>,
    ttl: Duration,
}

/// 按条目携带的 TTL 过期
struct PerEntryExpiry;

impl Expiry<String, L1Entry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &L1Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// 分层缓存
///
/// 所有键统一加上命名空间前缀，clear 时按前缀清空远端层。
/// clone 共享底层缓存与计数器，可在并发的商品解析之间自由传递。
#[derive(Clone)]
pub struct TieredCache {
    l1: LocalCache<String, L1Entry>,
    l2: Option<RemoteCache>,
    l1_default_ttl: Duration,
    l2_default_ttl: Duration,
    key_prefix: String,
    counters: Arc<CacheCounters>,
}

impl TieredCache {
    /// 创建分层缓存
    ///
    /// `remote` 为 None 时退化为纯 L1 缓存（开发/测试环境）。
    pub fn new(config: &CacheConfig, remote: Option<RemoteCache>) -> Self {
        let l1 = LocalCache::builder()
            .max_capacity(config.l1_max_capacity_bytes)
            // 以键长 + 负载长估算条目字节数
            .weigher(|key: &String, entry: &L1Entry| {
                (key.len() + entry.payload.len()).min(u32::MAX as usize) as u32
            })
            .expire_after(PerEntryExpiry)
            .build();

        Self {
            l1,
            l2: remote,
            l1_default_ttl: config.l1_default_ttl(),
            l2_default_ttl: config.l2_default_ttl(),
            key_prefix: config.key_prefix.clone(),
            counters: Arc::new(CacheCounters::new()),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    /// 读取值
    ///
    /// 先查 L1；L1 未命中时查 L2（如启用），L2 命中会以 L1 默认 TTL
    /// 提升到 L1；两层都未命中才计为 miss。每次调用恰好更新一个计数器。
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.namespaced(key);

        if let Some(entry) = self.l1.get(&full_key).await {
            self.counters.record_l1_hit();
            return parse_payload(&full_key, &entry.payload);
        }

        if let Some(remote) = &self.l2 {
            match remote.get_raw(&full_key).await {
                Ok(Some(payload)) => {
                    // 提升到 L1，后续同键读取走本地
                    self.l1
                        .insert(
                            full_key.clone(),
                            L1Entry {
                                payload: Arc::from(payload.as_str()),
                                ttl: self.l1_default_ttl,
                            },
                        )
                        .await;
                    self.counters.record_l2_hit();
                    return parse_payload(&full_key, &payload);
                }
                Ok(None) => {}
                Err(e) => {
                    // 远端故障按未命中处理，不影响调用方
                    warn!(key = %full_key, error = %e, "L2 缓存读取失败，按未命中处理");
                }
            }
        }

        self.counters.record_miss();
        None
    }

    /// 写入值
    ///
    /// `ttl` 作用于 L1 条目；L2 使用远端层自己的默认 TTL（更长）。
    /// L1 同步写入，L2 异步写入且失败只记日志。
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let full_key = self.namespaced(key);

        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(e) => {
                // 坏负载不允许拖垮请求
                warn!(key = %full_key, error = %e, "缓存序列化失败，放弃写入");
                return;
            }
        };

        self.l1
            .insert(
                full_key.clone(),
                L1Entry {
                    payload: Arc::from(payload.as_str()),
                    ttl,
                },
            )
            .await;

        if let Some(remote) = &self.l2 {
            let remote = remote.clone();
            let l2_ttl = self.l2_default_ttl;
            tokio::spawn(async move {
                if let Err(e) = remote.set_raw(&full_key, &payload, l2_ttl).await {
                    warn!(key = %full_key, error = %e, "L2 缓存写入失败");
                }
            });
        }
    }

    /// 以默认 L1 TTL 写入值
    pub async fn set_default<T: Serialize>(&self, key: &str, value: &T) {
        self.set(key, value, self.l1_default_ttl).await;
    }

    /// 从两层删除键
    pub async fn remove(&self, key: &str) {
        let full_key = self.namespaced(key);
        self.l1.invalidate(&full_key).await;

        if let Some(remote) = &self.l2 {
            if let Err(e) = remote.delete(&full_key).await {
                warn!(key = %full_key, error = %e, "L2 缓存删除失败");
            }
        }
    }

    /// 清空缓存并重置统计
    ///
    /// 按命名空间前缀清空远端层；L1 条目不做确定性驱逐，
    /// 由各自的 TTL 自然过期（可接受的短暂陈旧窗口）。
    pub async fn clear(&self) {
        if let Some(remote) = &self.l2 {
            match remote.delete_pattern(&format!("{}:*", self.key_prefix)).await {
                Ok(count) => debug!(count, "L2 缓存已按前缀清空"),
                Err(e) => warn!(error = %e, "L2 缓存清空失败"),
            }
        }

        self.counters.reset();
        info!("缓存统计已重置");
    }

    /// 当前统计快照
    pub fn stats(&self) -> CacheStatistics {
        self.counters.snapshot()
    }
}

fn parse_payload<T: DeserializeOwned>(key: &str, payload: &str) -> Option<T> {
    match serde_json::from_str(payload) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key, error = %e, "缓存负载反序列化失败");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// 缓存键生成器
// ---------------------------------------------------------------------------

/// 缓存键生成器
pub struct CacheKey;

impl CacheKey {
    pub fn catalog_entry(sku: &str) -> String {
        format!("catalog:sku:{}", sku)
    }

    pub fn merchant_rules(merchant_id: &str) -> String {
        format!("rules:merchant:{}", merchant_id)
    }

    pub fn country_rules(country_code: &str) -> String {
        format!("rules:country:{}", country_code)
    }
}
