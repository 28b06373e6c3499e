//! HTTP provisioning
//!
//! 调用外部 provisioning 服务：
//! - `POST {endpoint}/grants`
//! - `POST {endpoint}/revocations`
//!
//! 非 2xx 响应视为失败，不重试。

use async_trait::async_trait;
use permit_common::SubjectId;
use permit_errors::{AppError, AppResult};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use tracing::debug;

use crate::domain::ProvisioningService;

#[derive(Debug, Serialize)]
struct GrantRequest<'a> {
    subject_id: &'a SubjectId,
    application_name: &'a str,
    permission_level: &'a str,
    expiry_seconds: u64,
}

#[derive(Debug, Serialize)]
struct RevokeRequest<'a> {
    subject_id: &'a SubjectId,
    application_name: &'a str,
}

pub struct HttpProvisioning {
    client: Client,
    endpoint: String,
    api_token: Option<Secret<String>>,
}

impl HttpProvisioning {
    pub fn new(endpoint: impl Into<String>, api_token: Option<Secret<String>>) -> AppResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_token,
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> AppResult<()> {
        let url = format!("{}/{path}", self.endpoint);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::external_service(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AppError::external_service(format!(
                "POST {url} returned {status}: {body}"
            )));
        }

        debug!(url = %url, status = %status, "Provisioning request accepted");
        Ok(())
    }
}

#[async_trait]
impl ProvisioningService for HttpProvisioning {
    async fn grant(
        &self,
        subject: &SubjectId,
        application_name: &str,
        permission_level: &str,
        expiry_seconds: u64,
    ) -> AppResult<()> {
        self.post(
            "grants",
            &GrantRequest {
                subject_id: subject,
                application_name,
                permission_level,
                expiry_seconds,
            },
        )
        .await
    }

    async fn revoke(&self, subject: &SubjectId, application_name: &str) -> AppResult<()> {
        self.post(
            "revocations",
            &RevokeRequest {
                subject_id: subject,
                application_name,
            },
        )
        .await
    }
}
