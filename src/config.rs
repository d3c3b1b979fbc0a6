//! Compiled-in defaults and TOML config-file loading shared by both binaries
//! (§6 "RPC endpoints", §10.2).

use std::path::Path;

use serde::de::DeserializeOwned;

/// Well-known port the naming server's client service listens on by default.
pub const DEFAULT_SERVICE_PORT: u16 = 9000;
/// Well-known port the naming server's registration service listens on by default.
pub const DEFAULT_REGISTRATION_PORT: u16 = 9001;
/// Default port a storage node's data endpoint listens on.
pub const DEFAULT_DATA_PORT: u16 = 9002;
/// Default port a storage node's command endpoint listens on.
pub const DEFAULT_COMMAND_PORT: u16 = 9003;

pub use crate::naming::DEFAULT_REPLICATION_THRESHOLD;
pub use crate::storage::COPY_CHUNK_BYTES as DEFAULT_COPY_CHUNK_BYTES;

/// Reads and deserializes a TOML config file. Every binary layers its
/// settings CLI flag > file value > compiled-in default.
pub fn read_toml_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
    toml::from_str(&text).map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))
}
