use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;

use mnemo_core::{LlmProvider, LlmRequest, LlmResponse, SchemaSpec};

/// A mock LLM provider with scriptable responses.
///
/// Used in tests and for offline runs; structured calls fail unless a
/// structured response was configured, which exercises the callers'
/// degraded paths.
pub struct MockProvider {
    name: String,
    fixed_response: Option<String>,
    structured_response: Option<serde_json::Value>,
    structured_by_schema: HashMap<String, serde_json::Value>,
    fail: bool,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_response: None,
            structured_response: None,
            structured_by_schema: HashMap::new(),
            fail: false,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    /// Structured response returned for any schema without a dedicated script.
    pub fn with_structured_response(mut self, response: serde_json::Value) -> Self {
        self.structured_response = Some(response);
        self
    }

    /// Structured response returned for one schema name specifically.
    pub fn with_structured_response_for(
        mut self,
        schema_name: impl Into<String>,
        response: serde_json::Value,
    ) -> Self {
        self.structured_by_schema.insert(schema_name.into(), response);
        self
    }

    /// Make every call fail, for exercising error paths.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        if self.fail {
            bail!("mock provider configured to fail");
        }
        Ok(LlmResponse {
            content: self
                .fixed_response
                .clone()
                .unwrap_or_else(|| "Mock response".to_string()),
            provider: self.name.clone(),
            model: request.model.clone(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }

    async fn complete_structured(
        &self,
        _request: &LlmRequest,
        schema: &SchemaSpec,
    ) -> Result<serde_json::Value> {
        if self.fail {
            bail!("mock provider configured to fail");
        }
        if let Some(v) = self.structured_by_schema.get(&schema.name) {
            return Ok(v.clone());
        }
        match &self.structured_response {
            Some(v) => Ok(v.clone()),
            None => bail!("mock provider has no structured response for '{}'", schema.name),
        }
    }
}
