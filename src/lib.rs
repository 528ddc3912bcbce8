//! Ticket Live - live event dashboard client
//!
//! ## Architecture
//!
//! - **livesockets**: real-time messaging client (re-exported from workspace)
//! - **settings**: YAML + environment configuration for the client
//! - **logging**: tracing initialisation shared by binaries
//! - **bin_common**: Common utilities for binary executables (CLI)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use ticket_live::bin_common::{load_config_from_env, ConfigType};
//! use ticket_live::settings::LiveConfig;
//!
//! let config = LiveConfig::load(load_config_from_env(ConfigType::Live))?;
//! let client = config.client_builder().build().await?;
//! ```

// Re-export workspace libraries for convenience
pub use livesockets;

pub mod logging;
pub mod settings;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;

    pub use cli::{config_path_from_args, load_config_from_env, parse_args, ConfigType};
}
