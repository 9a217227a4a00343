use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transport that forwards side effects to a chat gateway bridge over HTTP.
///
/// Routes (relative to the configured base URL):
/// - `POST   channels/{channel}/messages` -> `{ "id": "..." }`
/// - `DELETE channels/{channel}/messages/{message}` (404 = already gone)
/// - `POST   channels/{channel}/messages/{message}/reactions`
/// - `PUT    members/{user}/roles/{role}`
/// - `DELETE members/{user}/roles/{role}`
/// - `GET    members/{user}/roles` -> `{ "roles": [...] }`
pub struct HttpBridgeTransport {
    base_url: url::Url,
    token: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    id: MessageId,
}

#[derive(Debug, Serialize)]
struct ReactionRequest<'a> {
    emoji: &'a str,
}

#[derive(Debug, Serialize)]
struct RoleChangeRequest<'a> {
    reason: &'a str,
}

#[derive(Debug, Deserialize)]
struct MemberRolesResponse {
    #[serde(default)]
    roles: Vec<String>,
}

impl HttpBridgeTransport {
    /// Create a bridge transport. Every request is bounded by `timeout`.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> TransportResult<Self> {
        let mut base_url = url::Url::parse(base_url)
            .map_err(|e| TransportError::Request(format!("Invalid bridge URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Request(format!(
                "Bridge URL {} cannot be used as a base",
                base_url
            )));
        }
        // Keep joined segments under the configured path
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            token,
            client,
            timeout,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> url::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: reqwest::Method, url: url::Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Request(e.to_string())
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> TransportResult<reqwest::Response> {
        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        Ok(response)
    }

    async fn expect_success(response: reqwest::Response) -> TransportResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ChatTransport for HttpBridgeTransport {
    async fn post_message(&self, channel_id: &str, content: &str) -> TransportResult<MessageId> {
        let url = self.endpoint(&["channels", channel_id, "messages"]);
        let response = self
            .send(
                self.request(reqwest::Method::POST, url)
                    .json(&PostMessageRequest { content }),
            )
            .await?;
        let response = Self::expect_success(response).await?;

        let posted: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(posted.id)
    }

    async fn delete_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> TransportResult<DeleteOutcome> {
        let url = self.endpoint(&["channels", channel_id, "messages", message_id]);
        let response = self
            .send(self.request(reqwest::Method::DELETE, url))
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        Self::expect_success(response).await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> TransportResult<()> {
        let url = self.endpoint(&["channels", channel_id, "messages", message_id, "reactions"]);
        let response = self
            .send(
                self.request(reqwest::Method::POST, url)
                    .json(&ReactionRequest { emoji }),
            )
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn grant_role(&self, user_id: &str, role_id: &str, reason: &str) -> TransportResult<()> {
        let url = self.endpoint(&["members", user_id, "roles", role_id]);
        let response = self
            .send(
                self.request(reqwest::Method::PUT, url)
                    .json(&RoleChangeRequest { reason }),
            )
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn revoke_role(
        &self,
        user_id: &str,
        role_id: &str,
        reason: &str,
    ) -> TransportResult<()> {
        let url = self.endpoint(&["members", user_id, "roles", role_id]);
        let response = self
            .send(
                self.request(reqwest::Method::DELETE, url)
                    .json(&RoleChangeRequest { reason }),
            )
            .await?;

        // Revoking a role the member no longer has is fine
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn has_role(&self, user_id: &str, role_id: &str) -> TransportResult<bool> {
        let url = self.endpoint(&["members", user_id, "roles"]);
        let response = self.send(self.request(reqwest::Method::GET, url)).await?;
        let response = Self::expect_success(response).await?;

        let member: MemberRolesResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(member.roles.iter().any(|r| r == role_id))
    }

    fn name(&self) -> &str {
        "http-bridge"
    }
}
