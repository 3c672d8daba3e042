//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Redis 配置（L2 共享缓存层）
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
        }
    }
}

/// 分层缓存配置
///
/// L1 为进程内缓存，按字节预算淘汰；L2 为共享 Redis 缓存。
/// 两层使用不同的默认 TTL：目录条目在 L1 存活数小时，
/// AI 判定结果在 L2 最长保留两天。
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// L1 缓存总字节预算
    pub l1_max_capacity_bytes: u64,
    /// L1 默认 TTL（秒）
    pub l1_default_ttl_seconds: u64,
    /// 是否启用 L2 共享缓存
    pub l2_enabled: bool,
    /// L2 默认 TTL（秒）
    pub l2_default_ttl_seconds: u64,
    /// 缓存键命名空间前缀
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_max_capacity_bytes: 64 * 1024 * 1024,
            l1_default_ttl_seconds: 6 * 60 * 60,
            l2_enabled: true,
            l2_default_ttl_seconds: 48 * 60 * 60,
            key_prefix: "voucher".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn l1_default_ttl(&self) -> Duration {
        Duration::from_secs(self.l1_default_ttl_seconds)
    }

    pub fn l2_default_ttl(&self) -> Duration {
        Duration::from_secs(self.l2_default_ttl_seconds)
    }
}

/// 外部 AI 分类服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// 服务端点（chat-completion 风格接口）
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// 单次调用超时（秒）
    pub attempt_timeout_seconds: u64,
    /// 最大重试次数（不含首次调用）
    pub max_retries: u32,
    pub temperature: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            attempt_timeout_seconds: 30,
            max_retries: 3,
            temperature: 0.0,
        }
    }
}

impl AiConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_seconds)
    }
}

/// 商户规则加载配置
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    /// 商户规则缓存 TTL（秒）——规则可能被后台更新，保持较短
    pub cache_ttl_seconds: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 300,
        }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub ai: AiConfig,
    pub rules: RulesConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. 环境变量（VOUCHER_ 前缀，如 VOUCHER_REDIS_URL -> redis.url）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("VOUCHER_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                Environment::with_prefix("VOUCHER")
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
