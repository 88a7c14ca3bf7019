//! Connection parameters of the hosted services

use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use url::Url;

/// Prefix of the environment variables read by [`BackendConfig::from_env`] (e.g. `TODO_API_KEY`).
/// Feel free to override it when initing this library.
pub static ENV_PREFIX: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("TODO_".to_string())));

pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1/";
pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1/";

/// Everything needed to reach the identity service and the document store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    #[serde(default)]
    pub measurement_id: Option<String>,
    #[serde(default, rename = "databaseURL")]
    pub database_url: Option<String>,

    /// Base URL of the identity REST API. Can be changed to target an emulator
    #[serde(default = "default_identity_endpoint")]
    pub identity_endpoint: Url,
    /// Base URL of the document store REST API. Can be changed to target an emulator
    #[serde(default = "default_firestore_endpoint")]
    pub firestore_endpoint: Url,
}

fn default_identity_endpoint() -> Url {
    Url::parse(DEFAULT_IDENTITY_ENDPOINT).unwrap(/* this cannot panic since this is a constant valid URL */)
}

fn default_firestore_endpoint() -> Url {
    Url::parse(DEFAULT_FIRESTORE_ENDPOINT).unwrap(/* this cannot panic since this is a constant valid URL */)
}

impl BackendConfig {
    /// Read the configuration from environment variables, named after [`ENV_PREFIX`]
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        let prefix = ENV_PREFIX.lock().map(|p| p.clone()).unwrap_or_else(|poisoned| poisoned.into_inner().clone());
        Self::from_lookup(&prefix, |key| std::env::var(key).ok())
    }

    /// Read the configuration from any key/value source (`lookup` returns `None` for missing keys)
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(format!("{}{}", prefix, name).as_str()).filter(|value| value.is_empty() == false);
        let required = |name: &str| -> Result<String, Box<dyn Error>> {
            optional(name).ok_or_else(|| format!("Missing environment variable {}{}", prefix, name).into())
        };

        let identity_endpoint = match optional("IDENTITY_ENDPOINT") {
            None => default_identity_endpoint(),
            Some(url) => Url::parse(&url)?,
        };
        let firestore_endpoint = match optional("FIRESTORE_ENDPOINT") {
            None => default_firestore_endpoint(),
            Some(url) => Url::parse(&url)?,
        };

        Ok(Self {
            api_key: required("API_KEY")?,
            auth_domain: required("AUTH_DOMAIN")?,
            project_id: required("PROJECT_ID")?,
            storage_bucket: required("STORAGE_BUCKET")?,
            messaging_sender_id: required("MESSAGING_SENDER_ID")?,
            app_id: required("APP_ID")?,
            measurement_id: optional("MEASUREMENT_ID"),
            database_url: optional("REALTIME_DATABASE_URL"),
            identity_endpoint,
            firestore_endpoint,
        })
    }

    /// Read the configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => file,
        };
        let config = serde_json::from_reader(file)?;
        Ok(config)
    }
}
