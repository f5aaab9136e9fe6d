//! # lz-adapter-arm
//!
//! Azure Resource Manager implementation of the landing-zone remote.
//!
//! Every call is a single REST request authenticated with a bearer token;
//! HTTP 404 is reported as absence. Acquiring the token is left to the
//! caller.

use async_trait::async_trait;
use lz_core::config::ArmConfig;
use lz_core::naming;
use lz_runtime::{
    PolicyAssignmentRequest, RemoteAssignment, RemoteError, RemoteGroup, RemoteLookup,
    RemoteMutator,
};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

pub mod error;
pub mod models;

pub use error::{ArmError, Result};

use models::{
    CreateAssignmentBody, CreateGroupBody, EntityPage, ErrorBody, ManagementGroup,
    PolicyAssignment,
};

pub const MANAGEMENT_GROUPS_API_VERSION: &str = "2021-04-01";
pub const POLICY_ASSIGNMENTS_API_VERSION: &str = "2022-06-01";

/// Token variable named in errors when the client is built without config.
pub const DEFAULT_TOKEN_ENV: &str = "ARM_ACCESS_TOKEN";

/// Upper bound on `getEntities` pages followed for one lookup.
const MAX_ENTITY_PAGES: usize = 100;

#[derive(Debug, Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: Url,
    token: String,
}

impl ArmClient {
    pub fn new(endpoint: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::build(endpoint, token.into(), timeout, DEFAULT_TOKEN_ENV)
    }

    fn build(endpoint: &str, token: String, timeout: Duration, token_env: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(ArmError::MissingToken {
                env_var: token_env.to_string(),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fabric-lz/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: Url::parse(endpoint)?,
            token,
        })
    }

    /// Build a client from configuration. `token` overrides the configured
    /// environment variable.
    pub fn from_config(config: &ArmConfig, token: Option<String>) -> Result<Self> {
        let token = token
            .or_else(|| config.token_from_env())
            .ok_or_else(|| ArmError::MissingToken {
                env_var: config.token_env.clone(),
            })?;
        Self::build(
            &config.endpoint,
            token,
            Duration::from_secs(config.timeout_secs),
            &config.token_env,
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, path: &str, api_version: &str) -> Result<Url> {
        let mut url = self.endpoint.join(path)?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response> {
        tracing::debug!(method = %method, url = %url, "ARM request");
        let mut request = self.http.request(method, url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        check_status(response).await
    }

    /// GET, mapping 404 to `None`.
    async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        match self.send::<()>(Method::GET, url, None).await {
            Ok(response) => Ok(Some(parse_json(response).await?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_subscription_parent(&self, subscription_id: &str) -> Result<Option<String>> {
        let mut url = self.url(
            "/providers/Microsoft.Management/getEntities",
            MANAGEMENT_GROUPS_API_VERSION,
        )?;

        for _ in 0..MAX_ENTITY_PAGES {
            let response = self
                .send(Method::POST, url, Some(&serde_json::json!({})))
                .await?;
            let page: EntityPage = parse_json(response).await?;

            if let Some(entity) = page
                .value
                .iter()
                .find(|e| e.is_subscription() && e.name.eq_ignore_ascii_case(subscription_id))
            {
                return Ok(entity.parent_group());
            }

            match page.next_link {
                Some(next) if !next.is_empty() => url = Url::parse(&next)?,
                _ => return Ok(None),
            }
        }

        tracing::warn!(
            subscription = subscription_id,
            pages = MAX_ENTITY_PAGES,
            "Gave up paging management group entities"
        );
        Ok(None)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.error);
    let (code, message) = match detail {
        Some(detail) => (detail.code, detail.message.unwrap_or_default()),
        None => (None, text),
    };
    let message = if message.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        message
    };

    Err(ArmError::Status {
        status: status.as_u16(),
        code,
        message,
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ArmError::invalid_response(e.to_string()))
}

fn group_path(id: &str) -> String {
    naming::management_group_scope(id)
}

fn assignment_path(scope: &str, name: &str) -> String {
    naming::policy_assignment_id(scope, name)
}

#[async_trait]
impl RemoteLookup for ArmClient {
    async fn find_management_group(
        &self,
        id: &str,
    ) -> std::result::Result<Option<RemoteGroup>, RemoteError> {
        let url = self.url(&group_path(id), MANAGEMENT_GROUPS_API_VERSION)?;
        let group: Option<ManagementGroup> = self.get_optional(url).await?;
        Ok(group.map(RemoteGroup::from))
    }

    async fn find_subscription_group(
        &self,
        subscription_id: &str,
    ) -> std::result::Result<Option<String>, RemoteError> {
        Ok(self.find_subscription_parent(subscription_id).await?)
    }

    async fn find_policy_assignment(
        &self,
        name: &str,
        scope: &str,
    ) -> std::result::Result<Option<RemoteAssignment>, RemoteError> {
        let url = self.url(&assignment_path(scope, name), POLICY_ASSIGNMENTS_API_VERSION)?;
        let assignment: Option<PolicyAssignment> = self.get_optional(url).await?;
        Ok(assignment.map(|a| a.into_remote(scope)))
    }
}

#[async_trait]
impl RemoteMutator for ArmClient {
    async fn create_management_group(
        &self,
        id: &str,
        display_name: &str,
        parent: Option<&str>,
    ) -> std::result::Result<RemoteGroup, RemoteError> {
        let url = self.url(&group_path(id), MANAGEMENT_GROUPS_API_VERSION)?;
        let body = CreateGroupBody::new(display_name, parent);
        let response = self.send(Method::PUT, url, Some(&body)).await?;

        // Creation is asynchronous: 202 carries no group body.
        if response.status() == StatusCode::ACCEPTED {
            tracing::debug!(group = id, "Management group creation accepted");
            return Ok(RemoteGroup {
                id: id.to_string(),
                display_name: display_name.to_string(),
                parent_id: parent.map(str::to_string),
            });
        }
        let group: ManagementGroup = parse_json(response).await?;
        Ok(group.into())
    }

    async fn move_subscription(
        &self,
        subscription_id: &str,
        target_group_id: &str,
    ) -> std::result::Result<(), RemoteError> {
        let path = format!(
            "{}/subscriptions/{}",
            group_path(target_group_id),
            subscription_id
        );
        let url = self.url(&path, MANAGEMENT_GROUPS_API_VERSION)?;
        self.send(Method::PUT, url, Some(&serde_json::json!({})))
            .await?;
        Ok(())
    }

    async fn create_policy_assignment(
        &self,
        request: &PolicyAssignmentRequest,
    ) -> std::result::Result<RemoteAssignment, RemoteError> {
        let url = self.url(
            &assignment_path(&request.scope, &request.name),
            POLICY_ASSIGNMENTS_API_VERSION,
        )?;
        let body = CreateAssignmentBody::from(request);
        let response = self.send(Method::PUT, url, Some(&body)).await?;
        let assignment: PolicyAssignment = parse_json(response).await?;
        Ok(assignment.into_remote(&request.scope))
    }
}
