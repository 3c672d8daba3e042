//! 协作方接口与内存实现

pub mod memory;
pub mod traits;

pub use memory::{InMemoryAuditSink, InMemoryCatalogStore, InMemoryRulesStore};
pub use traits::{AiCallParams, AiService, AuditSink, CatalogStore, RulesStore};
