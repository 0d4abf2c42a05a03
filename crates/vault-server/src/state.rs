use std::path::Path;
use std::sync::Arc;

use tracing::info;
use vault_core::{
    AuthGate, JsonFileRepository, RecordStore, RuntimeMode, SystemConfig, SystemConfigLoader,
};

use crate::error::AppError;

pub struct AppState {
    pub config: SystemConfig,
    pub store: Arc<RecordStore>,
    pub auth: AuthGate,
}

impl AppState {
    pub fn new(config: SystemConfig, store: Arc<RecordStore>, auth: AuthGate) -> Self {
        Self {
            config,
            store,
            auth,
        }
    }

    /// Validates config, builds the auth gate and opens the data file.
    /// Missing secrets are an error here; a bad data file is not.
    pub fn from_config(config: SystemConfig) -> Result<Self, AppError> {
        config.validate()?;
        let auth = AuthGate::new(config.auth_settings())?;
        let data_file = config.get_string("storage.data_file");
        info!(data_file = %data_file, "opening record store");
        let store = RecordStore::open(Arc::new(JsonFileRepository::new(data_file)));
        Ok(Self::new(config, Arc::new(store), auth))
    }

    pub fn is_production(&self) -> bool {
        matches!(self.config.mode(), Ok(RuntimeMode::Production))
    }
}

pub fn load_config(path: Option<&Path>) -> Result<SystemConfig, AppError> {
    let raw = match path {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };
    Ok(SystemConfigLoader::layered(raw.as_deref(), std::env::vars())?)
}
