//! 测试工具模块
//!
//! 提供集成测试所需的辅助函数与测试配置生成器。
//! 用于简化测试代码编写，提高测试的可重复性和可维护性。

use uuid::Uuid;

use crate::config::{CacheConfig, RedisConfig};

/// 创建测试用 Redis 配置
///
/// 优先使用环境变量，否则使用默认测试库
pub fn test_redis_config() -> RedisConfig {
    RedisConfig {
        url: std::env::var("TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379/1".to_string()),
        pool_size: 5,
    }
}

/// 创建测试用缓存配置（禁用 L2，短 TTL）
pub fn test_cache_config() -> CacheConfig {
    CacheConfig {
        l1_max_capacity_bytes: 1024 * 1024,
        l1_default_ttl_seconds: 60,
        l2_enabled: false,
        l2_default_ttl_seconds: 120,
        key_prefix: format!("test-{}", Uuid::new_v4()),
    }
}

/// 生成唯一的测试 SKU
pub fn test_sku() -> String {
    format!("test-sku-{}", Uuid::new_v4())
}

/// 生成唯一的测试商户 ID
pub fn test_merchant_id() -> String {
    format!("test-merchant-{}", Uuid::new_v4())
}
