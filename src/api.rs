use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::models::{
    ConfigUpdate, Device, DeviceDetail, FirmwareUpdateRequest, FirmwareVersion, LoginResponse,
    MassConfigUpdate, MassEditReport, MessageResponse, NewDevice, NewOrganisation, NewProfile,
    NewUser, Organisation, Profile, UserAccount,
};
use crate::session::SessionHandle;

/// Error taxonomy for backend calls. `Clone` so results can live in view
/// state (`yew_hooks::use_async` requires it).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Invalid or expired session. Callers clear the session and let the
    /// route guard redirect to login.
    #[error("session expired, please log in again")]
    Unauthorized,
    /// Server rejected the request; carries the server-provided message
    /// when present.
    #[error("{message}")]
    Api { status: u16, message: String },
    /// The request never completed.
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Thin facade over reqwest: configured base URL plus the bearer token of
/// the current session on every request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Api {
    token: Option<String>,
}

impl Api {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub fn from_session(session: &SessionHandle) -> Self {
        Self::new(session.token())
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let mut builder = reqwest::Client::new()
            .request(method, config::api_url(endpoint))
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let body = Self::send_raw(builder).await?;
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn send_raw(builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let message = parsed
                .detail
                .or(parsed.message)
                .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        Self::send(self.request(Method::GET, endpoint)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        Self::send(self.request(Method::POST, endpoint).json(body)).await
    }

    // ── auth ────────────────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        #[derive(Serialize)]
        struct Credentials<'a> {
            email: &'a str,
            password: &'a str,
        }
        self.post("login", &Credentials { email, password }).await
    }

    /// Best-effort server-side logout notification. The local session is
    /// cleared regardless of the outcome, so failures are only logged.
    pub async fn logout(&self) {
        if let Err(err) = Self::send_raw(self.request(Method::POST, "logout")).await {
            log::warn!("logout notification failed: {err}");
        }
    }

    // ── devices ─────────────────────────────────────────────────────────

    pub async fn devices(&self) -> Result<Vec<Device>, ApiError> {
        self.get("device").await
    }

    pub async fn device(&self, device_id: i64) -> Result<DeviceDetail, ApiError> {
        self.get(&format!("device/{device_id}")).await
    }

    pub async fn create_device(&self, device: &NewDevice) -> Result<MessageResponse, ApiError> {
        self.post("device", device).await
    }

    pub async fn update_device_firmware(
        &self,
        device_id: i64,
        update: &FirmwareUpdateRequest,
    ) -> Result<MessageResponse, ApiError> {
        self.post(&format!("device/{device_id}/update_firmware"), update)
            .await
    }

    pub async fn update_config(&self, update: &ConfigUpdate) -> Result<MessageResponse, ApiError> {
        self.post("config/update", update).await
    }

    pub async fn mass_edit_config(
        &self,
        update: &MassConfigUpdate,
    ) -> Result<MassEditReport, ApiError> {
        self.post("config/mass_edit", update).await
    }

    // ── profiles ────────────────────────────────────────────────────────

    pub async fn profiles(&self) -> Result<Vec<Profile>, ApiError> {
        self.get("profiles").await
    }

    pub async fn profile(&self, id: &str) -> Result<Profile, ApiError> {
        self.get(&format!("profiles/{id}")).await
    }

    pub async fn create_profile(&self, profile: &NewProfile) -> Result<MessageResponse, ApiError> {
        self.post("profiles", profile).await
    }

    // ── firmware ────────────────────────────────────────────────────────

    pub async fn firmware_versions(&self) -> Result<Vec<FirmwareVersion>, ApiError> {
        self.get("firmware").await
    }

    pub async fn firmware(&self, id: &str) -> Result<FirmwareVersion, ApiError> {
        self.get(&format!("firmware/{id}")).await
    }

    pub async fn upload_firmware(
        &self,
        upload: FirmwareUpload,
    ) -> Result<MessageResponse, ApiError> {
        let part = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.file_name);
        let form = reqwest::multipart::Form::new()
            .text("firmware_version", upload.firmware_version)
            .text("firmware_type", upload.firmware_type)
            .text("description", upload.description)
            .part("file", part);
        Self::send(self.request(Method::POST, "firmware/upload").multipart(form)).await
    }

    pub async fn update_firmware_type(
        &self,
        firmware_id: &str,
        firmware_type: &str,
    ) -> Result<MessageResponse, ApiError> {
        let form = reqwest::multipart::Form::new()
            .text("firmware_id", firmware_id.to_string())
            .text("firmware_type", firmware_type.to_string());
        Self::send(
            self.request(Method::POST, "firmware/updatefirmware_type")
                .multipart(form),
        )
        .await
    }

    /// Direct link for a firmware artifact, used as a plain anchor href.
    pub fn firmware_download_url(firmware_id: &str, artifact: &str) -> String {
        config::api_url(&format!("firmware/{firmware_id}/download/{artifact}"))
    }

    // ── users & organisations ───────────────────────────────────────────

    pub async fn users(&self) -> Result<Vec<UserAccount>, ApiError> {
        self.get("users").await
    }

    pub async fn user(&self, id: &str) -> Result<UserAccount, ApiError> {
        self.get(&format!("users/{id}")).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<MessageResponse, ApiError> {
        self.post("users", user).await
    }

    pub async fn organisations(&self) -> Result<Vec<Organisation>, ApiError> {
        self.get("organisations").await
    }

    pub async fn create_organisation(
        &self,
        organisation: &NewOrganisation,
    ) -> Result<MessageResponse, ApiError> {
        self.post("organisations", organisation).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FirmwareUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub firmware_version: String,
    pub firmware_type: String,
    pub description: String,
}

/// An authorization failure is the one error class that affects global
/// state: it forces the same cleanup as an explicit logout, after which the
/// route guard redirects to the login page.
pub fn expire_if_unauthorized(session: &SessionHandle, error: &Option<ApiError>) {
    if matches!(error, Some(ApiError::Unauthorized)) {
        log::warn!("session rejected by backend, clearing credentials");
        session.expire();
    }
}
