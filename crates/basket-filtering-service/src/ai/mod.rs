//! AI 分类层：HTTP 客户端、适配器与业务规则安全校验

pub mod adapter;
pub mod http;
pub mod safeguard;

pub use adapter::{AiClassifierAdapter, ClassificationContext, LOW_CONFIDENCE_FALLBACK};
pub use http::HttpAiService;
pub use safeguard::BusinessRuleOverride;
