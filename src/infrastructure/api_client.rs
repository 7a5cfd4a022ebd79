use crate::domain::models::{DueNotice, FocusSessionRecord, Task, TaskStatus, User};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

const AUTH_TOKEN_HEADER: &str = "x-auth-token";

#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<String, InfraError>;

    async fn current_user(&self, token: &str) -> Result<User, InfraError>;

    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, InfraError>;

    async fn update_task_status(
        &self,
        token: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task, InfraError>;

    async fn create_focus_session(
        &self,
        token: &str,
        record: &FocusSessionRecord,
    ) -> Result<(), InfraError>;

    async fn due_notices(&self, token: &str) -> Result<Vec<DueNotice>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBackendClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, serde::Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, serde::Serialize)]
struct TaskStatusPatch {
    status: TaskStatus,
}

impl ReqwestBackendClient {
    pub fn new(base_url: &str) -> Result<Self, InfraError> {
        let base_url = Url::parse(base_url.trim()).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid api base url '{base_url}': {error}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(InfraError::InvalidConfig(format!(
                "api base url cannot be a base: {base_url}"
            )));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    fn ensure_token(token: &str) -> Result<(), InfraError> {
        if token.trim().is_empty() {
            return Err(InfraError::Unauthenticated);
        }
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| InfraError::InvalidConfig("api base URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn authorized(builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.bearer_auth(token).header(AUTH_TOKEN_HEADER, token)
    }

    fn http_error(status: StatusCode, body: &str, context: &str) -> InfraError {
        if status == StatusCode::UNAUTHORIZED {
            return InfraError::Unauthenticated;
        }
        let message = if body.trim().is_empty() {
            format!("{context} failed: http {}", status.as_u16())
        } else {
            format!("{context} failed: http {}; body={body}", status.as_u16())
        };
        InfraError::Http(message)
    }

    async fn send_for_body(builder: RequestBuilder, context: &str) -> Result<String, InfraError> {
        let response = builder
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("network error while {context}: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Http(format!("failed reading response while {context}: {error}")))?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body, context));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        builder: RequestBuilder,
        context: &str,
    ) -> Result<T, InfraError> {
        let body = Self::send_for_body(builder, context).await?;
        serde_json::from_str(&body).map_err(|error| {
            InfraError::Http(format!("invalid payload while {context}: {error}; body={body}"))
        })
    }
}

#[async_trait]
impl BackendClient for ReqwestBackendClient {
    async fn login(&self, email: &str, password: &str) -> Result<String, InfraError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(InfraError::InvalidInput(
                "email and password must not be empty".to_string(),
            ));
        }

        let url = self.endpoint(&["auth", "login"])?;
        let request = self.client.post(url).json(&LoginRequest { email, password });
        let response: LoginResponse = Self::send_json(request, "logging in").await?;
        if response.token.trim().is_empty() {
            return Err(InfraError::Http("login response carried an empty token".to_string()));
        }
        Ok(response.token)
    }

    async fn current_user(&self, token: &str) -> Result<User, InfraError> {
        Self::ensure_token(token)?;
        let url = self.endpoint(&["users", "me"])?;
        let request = Self::authorized(self.client.get(url), token);
        Self::send_json(request, "fetching current user").await
    }

    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, InfraError> {
        Self::ensure_token(token)?;
        let url = self.endpoint(&["tasks"])?;
        let request = Self::authorized(self.client.get(url), token);
        Self::send_json(request, "listing tasks").await
    }

    async fn update_task_status(
        &self,
        token: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task, InfraError> {
        Self::ensure_token(token)?;
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(InfraError::InvalidInput("task id must not be empty".to_string()));
        }

        let url = self.endpoint(&["tasks", task_id])?;
        let request = Self::authorized(self.client.put(url), token).json(&TaskStatusPatch { status });
        Self::send_json(request, "updating task").await
    }

    async fn create_focus_session(
        &self,
        token: &str,
        record: &FocusSessionRecord,
    ) -> Result<(), InfraError> {
        Self::ensure_token(token)?;
        record.validate().map_err(InfraError::InvalidInput)?;

        let url = self.endpoint(&["focus-sessions"])?;
        let request = Self::authorized(self.client.post(url), token).json(record);
        Self::send_for_body(request, "logging focus session").await?;
        Ok(())
    }

    async fn due_notices(&self, token: &str) -> Result<Vec<DueNotice>, InfraError> {
        Self::ensure_token(token)?;
        let url = self.endpoint(&["tasks", "notifications"])?;
        let request = Self::authorized(self.client.get(url), token);
        Self::send_json(request, "fetching due notifications").await
    }
}
