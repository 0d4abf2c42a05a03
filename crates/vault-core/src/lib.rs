pub mod config;
pub mod csv_bridge;
pub mod query;
pub mod record;
pub mod repository;
pub mod security;
pub mod static_config;
pub mod store;

pub use config::{ConfigError, RuntimeMode, SystemConfig, SystemConfigLoader};
pub use csv_bridge::{export_csv, import_csv, CsvError, CsvImport};
pub use query::{query, Facet, Page, PageRequest, QueryError, SearchQuery};
pub use record::{generate_id, Record, ID_FIELD, TIMESTAMP_FIELD};
pub use repository::{
    decode_snapshot, Collection, InMemoryRecordRepository, JsonFileRepository, RecordRepository,
    RepositoryError, StoreSnapshot,
};
pub use security::{AuthError, AuthGate, AuthSettings, IssuedToken, Role, TokenClaims};
pub use store::{RecordStore, StoreError};
