// web_fetch.rs: HTTP(S) GET tool gated by domain rules.
//
// The URL's host is checked against `allow_domains` before any request
// is sent. Redirects are re-checked hop by hop with the same policy
// snapshot: a hop to a domain outside the allow list is not followed and
// the call fails as a policy denial.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::redirect;
use schemars::JsonSchema;
use serde::Deserialize;
use tg_policy::{PolicyEngine, PolicyHandle, ResourceKind};
use url::Url;

use crate::error::ToolError;
use crate::tool::{authorize_tool, parse_args, schema_for, Tool, ToolContext};

const MAX_REDIRECTS: usize = 10;

/// Parameters for `web_fetch`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WebFetchParams {
    /// Absolute http:// or https:// URL to fetch.
    pub url: String,
    /// Maximum body bytes to return. Capped by the call context.
    #[serde(default)]
    pub max_bytes: Option<usize>,
}

/// Fetches a URL from an allowlisted domain.
#[derive(Debug, Clone)]
pub struct WebFetchTool {
    policy: PolicyHandle,
    user_agent: String,
}

impl WebFetchTool {
    pub const NAME: &'static str = "web_fetch";

    pub fn new(policy: PolicyHandle) -> Self {
        Self {
            policy,
            user_agent: format!("toolgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    fn check(engine: &PolicyEngine, url: &Url) -> Result<(), ToolError> {
        let host = url.host_str().unwrap_or_default();
        let decision = engine.check_domain(Self::NAME, host);
        if decision.allowed {
            Ok(())
        } else {
            Err(ToolError::denied(Self::NAME, ResourceKind::Domain, &decision))
        }
    }

    fn client(&self, engine: Arc<PolicyEngine>) -> Result<reqwest::Client, ToolError> {
        let redirects = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            let allowed = attempt
                .url()
                .host_str()
                .is_some_and(|host| engine.check_domain(Self::NAME, host).allowed);
            if allowed {
                attempt.follow()
            } else {
                // Hand the 3xx back so the caller can report the denial.
                attempt.stop()
            }
        });
        reqwest::Client::builder()
            .redirect(redirects)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| ToolError::execution(Self::NAME, format!("building HTTP client: {}", e)))
    }
}

fn parse_url(raw: &str) -> Result<Url, ToolError> {
    let url = Url::parse(raw)
        .map_err(|e| ToolError::invalid_arguments(WebFetchTool::NAME, format!("invalid url: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ToolError::invalid_arguments(
            WebFetchTool::NAME,
            format!("unsupported url scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ToolError::invalid_arguments(WebFetchTool::NAME, "url has no host"));
    }
    Ok(url)
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Fetch a web page or API response over HTTP(S) from an allowed domain."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<WebFetchParams>()
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let engine = self.policy.current();
        authorize_tool(&engine, Self::NAME)?;
        let params: WebFetchParams = parse_args(Self::NAME, args)?;
        let url = parse_url(&params.url)?;

        Self::check(&engine, &url)?;

        let max_bytes = params
            .max_bytes
            .unwrap_or(ctx.max_output_bytes)
            .min(ctx.max_output_bytes);

        tracing::debug!(call_id = %ctx.call_id, url = %url, "web_fetch");
        let client = self.client(Arc::clone(&engine))?;
        let mut response = client
            .get(url.clone())
            .timeout(ctx.timeout)
            .send()
            .await
            .map_err(|e| ToolError::execution(Self::NAME, format!("request to {} failed: {}", url, e)))?;

        if response.status().is_redirection() {
            let target = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|loc| response.url().join(loc).ok());
            if let Some(target) = target {
                Self::check(&engine, &target)?;
            }
        }

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ToolError::execution(Self::NAME, format!("reading body: {}", e)))?
        {
            let room = max_bytes - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(serde_json::json!({
            "url": final_url,
            "status": status,
            "content_type": content_type,
            "body": String::from_utf8_lossy(&body),
            "truncated": truncated,
        }))
    }
}
