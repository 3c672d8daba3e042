//! 外部 AI 分类服务 HTTP 客户端
//!
//! 封装 chat-completion 风格接口的调用，通过 AiService trait 抽象，
//! 便于测试时注入可编程的 mock 实现。重试与响应解析由适配器负责，
//! 本层只做一次 HTTP 往返与错误转换。

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use voucher_shared::config::AiConfig;
use voucher_shared::error::{Result, VoucherError};

use crate::repository::{AiCallParams, AiService};

/// 系统提示词：约束模型只输出 JSON 判定
const SYSTEM_PROMPT: &str = "你是餐饮券商品分类器。根据给出的商品信息与国家规则，\
判断商品是否可用餐饮券支付。只输出一个 JSON 对象：\
{\"isEligible\": bool, \"confidence\": 0.0-1.0, \"reason\": \"简短理由\"}";

/// HTTP AI 分类服务客户端
pub struct HttpAiService {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpAiService {
    /// 创建客户端
    ///
    /// 单次请求超时由 reqwest 层兜底，适配器的逐次调用超时在其之上。
    pub fn new(config: &AiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.attempt_timeout())
            .build()?;

        info!(endpoint = %config.endpoint, "AI 分类服务客户端已初始化");

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl AiService for HttpAiService {
    async fn classify(&self, prompt: &str, params: &AiCallParams) -> Result<String> {
        let body = json!({
            "model": params.model,
            "temperature": params.temperature,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        debug!(model = %params.model, prompt_len = prompt.len(), "调用 AI 分类服务");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoucherError::ExternalService {
                service: "ai-classifier".to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let payload: serde_json::Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                VoucherError::AiResponseMalformed(
                    "响应缺少 choices[0].message.content".to_string(),
                )
            })?;

        Ok(content.to_string())
    }
}
