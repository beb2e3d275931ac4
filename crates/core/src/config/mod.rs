//! Configuration file discovery and loading
//!
//! The schema itself lives with the crate that owns it; this module only
//! knows how to find a TOML file and deserialize it.

mod loader;

pub use loader::{find_config_file, load_toml, ConfigFile};
