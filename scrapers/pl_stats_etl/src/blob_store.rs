use async_trait::async_trait;
use object_store::{azure::MicrosoftAzureBuilder, path::Path, ObjectStore, PutPayload};
use std::{collections::HashMap, sync::Arc};
use tracing::info;

use crate::{
    columnar::encode_parquet,
    config::StorageConfig,
    error::{EtlError, Result},
    pipeline::Publisher,
    types::Dataset,
};

/// Fields of an Azure storage connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureConnection {
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub use_emulator: bool,
}

impl AzureConnection {
    /// Parses `Key=Value;Key=Value` pairs; unknown keys are ignored.
    pub fn parse(connection_string: &str) -> Result<Self> {
        let pairs: HashMap<String, String> = connection_string
            .split(';')
            .filter(|part| !part.trim().is_empty())
            .map(|part| {
                part.split_once('=')
                    .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
                    .ok_or_else(|| {
                        EtlError::Config(format!("Malformed connection string segment '{}'", part))
                    })
            })
            .collect::<Result<_>>()?;

        let connection = Self {
            account_name: pairs.get("accountname").cloned(),
            account_key: pairs.get("accountkey").cloned(),
            use_emulator: pairs
                .get("usedevelopmentstorage")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };

        if !connection.use_emulator && connection.account_name.is_none() {
            return Err(EtlError::Config(
                "Connection string has no AccountName".to_string(),
            ));
        }
        Ok(connection)
    }
}

pub struct ObjectStorePublisher {
    store: Arc<dyn ObjectStore>,
    prefix: Option<String>,
}

impl ObjectStorePublisher {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<String>) -> Self {
        Self { store, prefix }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let connection_string = config.connection_string.as_deref().ok_or_else(|| {
            EtlError::Config("AZURE_STORAGE_CONNECTION_STRING must be set".to_string())
        })?;
        let connection = AzureConnection::parse(connection_string)?;

        let mut builder = MicrosoftAzureBuilder::new().with_container_name(&config.container);
        if connection.use_emulator {
            builder = builder.with_use_emulator(true);
        }
        if let Some(account) = &connection.account_name {
            builder = builder.with_account(account);
        }
        if let Some(key) = &connection.account_key {
            builder = builder.with_access_key(key);
        }
        let store = builder
            .build()
            .map_err(|e| EtlError::Config(format!("Invalid Azure storage settings: {}", e)))?;

        Ok(Self::new(Arc::new(store), config.prefix.clone()))
    }

    pub fn object_path(&self, dataset: &str) -> Path {
        let file = format!("{}.parquet", dataset);
        match &self.prefix {
            Some(prefix) => Path::from(format!("{}/{}", prefix.trim_matches('/'), file)),
            None => Path::from(file),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}

#[async_trait]
impl Publisher for ObjectStorePublisher {
    fn name(&self) -> &'static str {
        "object-store"
    }

    async fn publish(&self, dataset: &Dataset) -> Result<()> {
        let path = self.object_path(&dataset.name);
        let bytes = encode_parquet(dataset)?;
        let size = bytes.len();

        self.store
            .put(&path, PutPayload::from(bytes))
            .await
            .map_err(|e| EtlError::upload(path.as_ref(), e))?;

        info!("Uploaded {} ({} bytes) to {}", dataset.name, size, path);
        Ok(())
    }
}
