mod settings;

pub use settings::{ClientConfig, IpConfig, RecordDefaults, Settings, CONFIG_PATH_ENV};
