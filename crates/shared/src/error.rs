//! 统一错误处理模块
//!
//! 定义系统中所有共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum VoucherError {
    // ==================== 缓存错误 ====================
    #[error("Redis 错误: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("缓存未命中: {key}")]
    CacheMiss { key: String },

    #[error("缓存序列化失败: {0}")]
    CacheSerialization(String),

    // ==================== 商户规则错误 ====================
    #[error("商户规则未找到: merchant_id={merchant_id}")]
    MerchantRulesNotFound { merchant_id: String },

    #[error("规则评估失败: {0}")]
    RuleEvaluationFailed(String),

    #[error("营业时段配置无效: {0}")]
    InvalidOperatingWindow(String),

    // ==================== AI 分类错误 ====================
    #[error("AI 响应格式无效: {0}")]
    AiResponseMalformed(String),

    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    // ==================== 存储错误 ====================
    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("存储访问失败: {0}")]
    Store(String),

    // ==================== 外部服务错误 ====================
    #[error("外部服务错误: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("外部服务超时: {service}")]
    ExternalServiceTimeout { service: String },

    // ==================== 验证错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),

    #[error("{0}")]
    Custom(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, VoucherError>;

impl VoucherError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Redis(_) => "REDIS_ERROR",
            Self::CacheMiss { .. } => "CACHE_MISS",
            Self::CacheSerialization(_) => "CACHE_SERIALIZATION_ERROR",
            Self::MerchantRulesNotFound { .. } => "MERCHANT_RULES_NOT_FOUND",
            Self::RuleEvaluationFailed(_) => "RULE_EVALUATION_FAILED",
            Self::InvalidOperatingWindow(_) => "INVALID_OPERATING_WINDOW",
            Self::AiResponseMalformed(_) => "AI_RESPONSE_MALFORMED",
            Self::Http(_) => "HTTP_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Store(_) => "STORE_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::ExternalServiceTimeout { .. } => "EXTERNAL_SERVICE_TIMEOUT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Custom(_) => "CUSTOM_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// AI 调用的网络故障、非 2xx 响应和格式错误都属于瞬时故障，
    /// 由重试执行器按退避策略重试；业务逻辑错误不重试。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Redis(_)
                | Self::Http(_)
                | Self::AiResponseMalformed(_)
                | Self::ExternalService { .. }
                | Self::ExternalServiceTimeout { .. }
        )
    }
}
