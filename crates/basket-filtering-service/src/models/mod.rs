//! 领域模型
//!
//! 购物篮商品、商户/国家规则、商品目录与判定结果。

pub mod catalog;
pub mod item;
pub mod rules;
pub mod verdict;

pub use catalog::{CatalogEntry, NormalizedCategory};
pub use item::{AncillaryFee, BasketItem, FeeKind};
pub use rules::{
    ALCOHOL_COMBO_CATEGORY_ID, CategoryRule, CountryRules, MerchantRules, OperatingWindow,
};
pub use verdict::{
    AiVerdict, CONFIDENCE_TRUST_THRESHOLD, CategorizedItem, Provenance, ResolutionStage,
    VerdictSource,
};
