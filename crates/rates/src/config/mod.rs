//! Settings: the `gosend.toml` schema, loading and validation
//!
//! Settings resolve into an [`EngineConfig`](crate::engine::EngineConfig)
//! and [`MethodSettings`](crate::method::MethodSettings) at load time; the
//! engine never sees raw configuration.

mod loader;
mod schema;
mod validate;

pub use loader::{apply_env, load, CONFIG_CANDIDATES, ENV_API_KEY, ENV_TIMEOUT_SECS};
pub use schema::{
    ApiSettings, DestinationSettings, GeneralSettings, OriginSettings, OriginType, Settings,
};
