//! Thin wrappers over [`ApiClient::call`] for the published NERIS routes.
//!
//! Bodies are passed through as JSON; no payload schemas are enforced here.
//! Use [`ApiClient::call_validated`] with your own model for that.

use reqwest::Method;
use serde_json::{Value, json};

use crate::errors::ClientError;
use crate::gateway::ApiClient;
use crate::response::{CallOutcome, RequestBody};

type CallResult = Result<CallOutcome, ClientError>;

impl ApiClient {
    async fn get(&self, path: &str) -> CallResult {
        self.call(Method::GET, path, None, None).await
    }

    async fn send(&self, method: Method, path: &str, body: impl Into<RequestBody>) -> CallResult {
        let body = body.into().into_value()?;
        self.call(method, path, Some(body), None).await
    }

    async fn send_empty(&self, method: Method, path: &str) -> CallResult {
        self.call(method, path, None, None).await
    }

    /// `GET /health`
    pub async fn health(&self) -> CallResult {
        self.get("/health").await
    }

    // ── entities ────────────────────────────────────────────────────────

    /// `GET /entity/{neris_id}`
    pub async fn get_entity(&self, neris_id: &str) -> CallResult {
        self.get(&format!("/entity/{neris_id}")).await
    }

    /// `POST /entity/`
    pub async fn create_entity(&self, body: impl Into<RequestBody>) -> CallResult {
        self.send(Method::POST, "/entity/", body).await
    }

    /// `PUT /entity/{neris_id}`
    pub async fn update_entity(&self, neris_id: &str, body: impl Into<RequestBody>) -> CallResult {
        self.send(Method::PUT, &format!("/entity/{neris_id}"), body).await
    }

    /// `PATCH /entity/{neris_id}`
    pub async fn patch_entity(&self, neris_id: &str, body: impl Into<RequestBody>) -> CallResult {
        self.send(Method::PATCH, &format!("/entity/{neris_id}"), body).await
    }

    /// `PATCH /entity/{entity}/station/{station}`
    pub async fn patch_station(
        &self,
        neris_id_entity: &str,
        neris_id_station: &str,
        body: impl Into<RequestBody>,
    ) -> CallResult {
        let path = format!("/entity/{neris_id_entity}/station/{neris_id_station}");
        self.send(Method::PATCH, &path, body).await
    }

    /// `PATCH /entity/{entity}/station/{station}/unit/{unit}`
    pub async fn patch_unit(
        &self,
        neris_id_entity: &str,
        neris_id_station: &str,
        neris_id_unit: &str,
        body: impl Into<RequestBody>,
    ) -> CallResult {
        let path =
            format!("/entity/{neris_id_entity}/station/{neris_id_station}/unit/{neris_id_unit}");
        self.send(Method::PATCH, &path, body).await
    }

    // ── users ───────────────────────────────────────────────────────────

    /// `GET /user/{sub}`
    pub async fn get_user(&self, sub: &str) -> CallResult {
        self.get(&format!("/user/{sub}")).await
    }

    /// `POST /user`
    pub async fn create_user(&self, body: impl Into<RequestBody>) -> CallResult {
        self.send(Method::POST, "/user", body).await
    }

    /// `PUT /user/{sub}`
    pub async fn update_user(&self, sub: &str, body: impl Into<RequestBody>) -> CallResult {
        self.send(Method::PUT, &format!("/user/{sub}"), body).await
    }

    /// `DELETE /user/{sub}`
    pub async fn delete_user(&self, sub: &str) -> CallResult {
        self.send_empty(Method::DELETE, &format!("/user/{sub}")).await
    }

    /// `GET /user/{sub}/user_entity_membership`
    pub async fn list_user_entity_memberships(&self, sub: &str) -> CallResult {
        self.get(&format!("/user/{sub}/user_entity_membership")).await
    }

    /// `POST /user/{sub}/user_entity_membership/{neris_id}`
    pub async fn create_user_entity_membership(&self, sub: &str, neris_id: &str) -> CallResult {
        let path = format!("/user/{sub}/user_entity_membership/{neris_id}");
        self.send_empty(Method::POST, &path).await
    }

    /// `DELETE /user/{sub}/user_entity_membership/{neris_id}`
    pub async fn delete_user_entity_membership(&self, sub: &str, neris_id: &str) -> CallResult {
        let path = format!("/user/{sub}/user_entity_membership/{neris_id}");
        self.send_empty(Method::DELETE, &path).await
    }

    /// `PUT /user/{sub}/user_entity_activation/{neris_id}` with `{active}`
    pub async fn update_user_entity_activation(
        &self,
        sub: &str,
        neris_id: &str,
        active: bool,
    ) -> CallResult {
        let path = format!("/user/{sub}/user_entity_activation/{neris_id}");
        self.send(Method::PUT, &path, json!({ "active": active })).await
    }

    /// `POST /auth/user_role_entity_set_attachment` with query parameters.
    pub async fn create_user_role_entity_set_attachment(
        &self,
        sub_user: &str,
        nuid_role: &str,
        nuid_entity_set: &str,
    ) -> CallResult {
        let params = [
            ("sub_user", sub_user),
            ("nuid_role", nuid_role),
            ("nuid_entity_set", nuid_entity_set),
        ];
        self.call(
            Method::POST,
            "/auth/user_role_entity_set_attachment",
            None,
            Some(&params),
        )
        .await
    }

    // ── incidents ───────────────────────────────────────────────────────

    /// `POST /incident/{neris_id}`
    pub async fn create_incident(&self, neris_id: &str, body: impl Into<RequestBody>) -> CallResult {
        self.send(Method::POST, &format!("/incident/{neris_id}"), body).await
    }

    /// `POST /incident/{neris_id}/validate`
    pub async fn validate_incident(
        &self,
        neris_id: &str,
        body: impl Into<RequestBody>,
    ) -> CallResult {
        self.send(Method::POST, &format!("/incident/{neris_id}/validate"), body)
            .await
    }

    /// `GET /incident/{neris_id}` with optional query parameters.
    pub async fn list_incidents(
        &self,
        neris_id: &str,
        params: Option<&[(&str, &str)]>,
    ) -> CallResult {
        self.call(Method::GET, &format!("/incident/{neris_id}"), None, params)
            .await
    }

    /// `PATCH /incident/{entity}/{incident}`
    pub async fn patch_incident(
        &self,
        neris_id_entity: &str,
        neris_id_incident: &str,
        body: impl Into<RequestBody>,
    ) -> CallResult {
        let path = format!("/incident/{neris_id_entity}/{neris_id_incident}");
        self.send(Method::PATCH, &path, body).await
    }

    /// `PUT /incident/{entity}/{incident}/status` with `{status}`
    pub async fn update_incident_status(
        &self,
        neris_id_entity: &str,
        neris_id_incident: &str,
        status: &str,
    ) -> CallResult {
        let path = format!("/incident/{neris_id_entity}/{neris_id_incident}/status");
        self.send(Method::PUT, &path, json!({ "status": status })).await
    }

    // ── account integrations ────────────────────────────────────────────

    /// `POST /account/integration/{neris_id}` with `{title}`
    pub async fn create_api_integration(&self, neris_id: &str, title: &str) -> CallResult {
        let body: Value = json!({ "title": title });
        self.send(Method::POST, &format!("/account/integration/{neris_id}"), body)
            .await
    }

    /// `POST /account/credential/{client_id}`
    pub async fn generate_api_secret(&self, client_id: &str) -> CallResult {
        self.send_empty(Method::POST, &format!("/account/credential/{client_id}"))
            .await
    }

    /// `GET /account/integration/{neris_id}/list`
    pub async fn list_integrations(&self, neris_id: &str) -> CallResult {
        self.get(&format!("/account/integration/{neris_id}/list")).await
    }

    /// `POST /account/enrollment/{neris_id}/{client_id}`
    pub async fn enroll_integration(&self, neris_id: &str, client_id: &str) -> CallResult {
        let path = format!("/account/enrollment/{neris_id}/{client_id}");
        self.send_empty(Method::POST, &path).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
