mod loader;

pub use loader::{load_config, CurlforgeConfig, LoadedConfig, CONFIG_FILE_NAME};
