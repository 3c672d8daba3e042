//! 购物篮过滤服务专用错误类型
//!
//! 在共享库 VoucherError 基础上定义本服务特有的错误变体。
//! 单个商品解析过程中的错误不会出现在这里——按设计它们被吸收为
//! 该商品的保守判定，购物篮级响应总是会产生。

use voucher_shared::error::VoucherError;

/// 购物篮过滤错误
#[derive(Debug, thiserror::Error)]
pub enum FilteringError {
    /// 商户规则加载失败且无过期副本可用，整个请求无法继续
    #[error("商户规则加载失败: {0}")]
    RulesUnavailable(String),

    /// 国家规则加载失败，AI 分类缺少提示词上下文
    #[error("国家规则加载失败: country={country_code} - {message}")]
    CountryRulesUnavailable {
        country_code: String,
        message: String,
    },

    /// 透传共享库错误，避免在每个 match 分支手动转换
    #[error(transparent)]
    Shared(#[from] VoucherError),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, FilteringError>;
