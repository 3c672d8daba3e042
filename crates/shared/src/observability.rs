//! 可观测性模块
//!
//! 提供 tracing 日志初始化与业务指标描述。
//! 指标通过 metrics crate 记录，导出器由服务入口按部署环境自行安装。

use anyhow::Result;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::ObservabilityConfig;

/// 初始化 tracing 日志
///
/// 优先使用 RUST_LOG 环境变量，其次使用配置中的 log_level。
/// log_format 为 json 时输出结构化日志，否则输出人类可读格式。
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.log_format == "json" {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// 注册通用指标描述
///
/// 描述文本会出现在导出端点的 HELP 注释中。
pub fn describe_metrics() {
    metrics::describe_counter!("cache_hits_total", "Total number of cache hits per tier");
    metrics::describe_counter!("cache_misses_total", "Total number of cache misses");

    metrics::describe_counter!(
        "item_classifications_total",
        "Total number of item classifications per resolution stage"
    );
    metrics::describe_histogram!(
        "item_classification_duration_seconds",
        "Item classification duration in seconds"
    );

    metrics::describe_counter!("ai_calls_total", "Total number of external AI classification calls");
    metrics::describe_counter!(
        "ai_fallbacks_total",
        "Total number of conservative fallback verdicts after AI failure"
    );

    metrics::describe_counter!("baskets_filtered_total", "Total number of baskets filtered");
}
