//! 购物篮过滤服务
//!
//! 将购物篮中的每个商品判定为"可用/不可用餐饮券支付"，产出逐商品
//! 原因与受每日限额约束的金额汇总。核心是级联回退的分类管线：
//! 目录缓存 → 确定性规则引擎 → 外部 AI 分类（含业务规则安全校验）→
//! 判定写回目录供后续复用。

pub mod aggregator;
pub mod ai;
pub mod classifier;
pub mod dto;
pub mod error;
pub mod models;
pub mod repository;
pub mod rules;
pub mod service;

pub use classifier::EligibilityClassifier;
pub use dto::{BasketFilteringResponse, BasketRequest};
pub use error::FilteringError;
pub use service::BasketFilteringService;
