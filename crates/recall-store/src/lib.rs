pub mod config;
pub mod error;
pub mod schema;
pub mod session;
pub mod store;
pub mod time;

pub use config::{Config, DB_FILE, EmbeddingConfig, WeightsSetting, default_data_dir};
pub use error::{Result, StoreError};
pub use session::{SessionOptions, StatsReport};
pub use store::{NewCard, Store};
pub use time::{end_of_day, format_timestamp, now_millis};
