//! CLI command implementations.

use std::net::SocketAddr;
use std::path::PathBuf;

use color_eyre::eyre::{eyre, Result, WrapErr};

use coffer_core::{CorruptItemPolicy, StoreConfig};
use coffer_server::{Server, ServerConfig};

use crate::config::Config;

/// Start the file resource server.
pub async fn serve(config: Config) -> Result<()> {
    let root = match config.storage_root.clone() {
        Some(root) => root,
        None => std::env::current_dir().wrap_err("cannot determine working directory")?,
    };

    let server_config = build_server_config(&config, root)?;
    Server::new(server_config).run().await?;
    Ok(())
}

fn build_server_config(config: &Config, root: PathBuf) -> Result<ServerConfig> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| eyre!("invalid listen address {}:{}: {}", config.host, config.port, e))?;

    let policy = if config.strict_items {
        CorruptItemPolicy::Reject
    } else {
        CorruptItemPolicy::TreatAsEmpty
    };

    let store = StoreConfig::builder()
        .root(root)
        .items_file(config.items_file.clone())
        .corrupt_items(policy)
        .max_upload_bytes(config.max_upload_bytes)
        .build()?;

    Ok(ServerConfig::builder()
        .addr(addr)
        .cors(config.cors)
        .store(store)
        .build())
}

/// Display version and build info.
pub fn version() {
    println!("coffer {}", env!("CARGO_PKG_VERSION"));
}
