//! Appetize.io upload client
//!
//! Uploads a zipped simulator build (or an `.ipa`/`.apk`) to Appetize and
//! returns the keys of the resulting app. Authentication is HTTP basic auth
//! with the API token as user name.

use std::path::Path;

use async_trait::async_trait;
use liftoff_core::config::{AppetizeSection, DEFAULT_APPETIZE_HOST};
use liftoff_core::EnvSource;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ActionError, UploadError};

/// Extensions Appetize accepts
const SUPPORTED_EXTENSIONS: [&str; 4] = [".zip", ".ipa", ".apk", ".tar.gz"];

/// Uploads an artifact to a preview service
#[async_trait]
pub trait PreviewUploader: Send + Sync {
    /// Upload the file and return the service's response
    async fn upload(&self, path: &Path) -> Result<AppetizeUpload, ActionError>;
}

/// Appetize client configuration
#[derive(Debug, Clone)]
pub struct AppetizeConfig {
    /// API token
    pub api_token: String,

    /// API host, without trailing slash
    pub api_host: String,

    /// Update this existing app instead of creating a new one
    pub public_key: Option<String>,

    /// Note shown in the Appetize dashboard
    pub note: Option<String>,

    /// `ios` or `android`
    pub platform: String,
}

impl AppetizeConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            api_host: DEFAULT_APPETIZE_HOST.to_string(),
            public_key: None,
            note: None,
            platform: "ios".to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, UploadError> {
        let api_token = env
            .var("APPETIZE_API_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                UploadError::ConfigurationError("APPETIZE_API_TOKEN not set".to_string())
            })?;

        let mut config = Self::new(api_token);
        if let Some(host) = env.var("APPETIZE_API_HOST") {
            config = config.with_api_host(host);
        }
        config.public_key = env.var("APPETIZE_PUBLIC_KEY");
        config.note = env.var("APPETIZE_NOTE");
        Ok(config)
    }

    /// Fill unset fields from the config file section
    pub fn with_section(mut self, section: &AppetizeSection) -> Self {
        if let Some(ref host) = section.api_host {
            if self.api_host == DEFAULT_APPETIZE_HOST {
                self = self.with_api_host(host.clone());
            }
        }
        if self.public_key.is_none() {
            self.public_key = section.public_key.clone();
        }
        if self.note.is_none() {
            self.note = section.note.clone();
        }
        if let Some(ref platform) = section.platform {
            self.platform = platform.clone();
        }
        self
    }

    pub fn with_api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Upload endpoint: create, or update when a public key is set
    pub fn upload_url(&self) -> String {
        match self.public_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => format!("{}/v1/apps/{}", self.api_host, key),
            None => format!("{}/v1/apps", self.api_host),
        }
    }
}

/// Appetize upload response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppetizeUpload {
    /// Public key identifying the app; this is what gets persisted
    pub public_key: String,

    #[serde(skip_serializing)]
    pub private_key: Option<String>,

    #[serde(rename = "publicURL")]
    pub public_url: Option<String>,

    #[serde(rename = "appURL")]
    pub app_url: Option<String>,

    #[serde(rename = "manageURL")]
    pub manage_url: Option<String>,
}

/// Appetize API client
pub struct AppetizeClient {
    config: AppetizeConfig,
    client: Client,
}

impl AppetizeClient {
    pub fn new(config: AppetizeConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn config(&self) -> &AppetizeConfig {
        &self.config
    }

    /// Upload a file to Appetize
    pub async fn upload_file(&self, path: &Path) -> Result<AppetizeUpload, UploadError> {
        if !path.is_file() {
            return Err(UploadError::InvalidArtifact(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.zip")
            .to_string();
        let lower = file_name.to_lowercase();
        if !SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            return Err(UploadError::InvalidArtifact(format!(
                "Unsupported file type: {}. Expected one of {}",
                file_name,
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        let url = self.config.upload_url();
        info!(path = %path.display(), url = %url, "uploading to Appetize");

        let content = tokio::fs::read(path).await?;
        debug!(bytes = content.len(), "read artifact");

        let mime = if lower.ends_with(".apk") {
            "application/vnd.android.package-archive"
        } else if lower.ends_with(".zip") {
            "application/zip"
        } else {
            "application/octet-stream"
        };
        let part = Part::bytes(content).file_name(file_name).mime_str(mime)?;

        let mut form = Form::new()
            .text("platform", self.config.platform.clone())
            .part("file", part);
        if let Some(ref note) = self.config.note {
            form = form.text("note", note.clone());
        }

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.api_token, None::<&str>)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UploadError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        let upload: AppetizeUpload = serde_json::from_str(&body)?;
        info!(public_key = %upload.public_key, "upload complete");
        Ok(upload)
    }
}

#[async_trait]
impl PreviewUploader for AppetizeClient {
    async fn upload(&self, path: &Path) -> Result<AppetizeUpload, ActionError> {
        Ok(self.upload_file(path).await?)
    }
}
