// Error type shared by every stage of the pipeline
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error("Fetch error for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Parse error in {dataset}: {message}")]
    Parse { dataset: String, message: String },
    #[error("Upload error for {path}: {source}")]
    Upload {
        path: String,
        #[source]
        source: object_store::Error,
    },
    #[error("Connection error: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("Schema error in {table}: {message}")]
    Schema { table: String, message: String },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Encode error: {0}")]
    Encode(#[from] parquet::errors::ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
    #[error("Config error: {0}")]
    Config(String),
}

impl EtlError {
    pub fn parse(dataset: &str, message: impl Into<String>) -> Self {
        EtlError::Parse {
            dataset: dataset.to_string(),
            message: message.into(),
        }
    }

    pub fn schema(table: &str, message: impl Into<String>) -> Self {
        EtlError::Schema {
            table: table.to_string(),
            message: message.into(),
        }
    }

    pub fn upload(path: &str, source: object_store::Error) -> Self {
        EtlError::Upload {
            path: path.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
