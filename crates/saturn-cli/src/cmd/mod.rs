pub mod config;
pub mod evaluate;
pub mod monitor;
pub mod org;
pub mod schedule;
pub mod serve;
pub mod user;

use anyhow::Context;
use saturn_core::config::Config;
use saturn_core::store::Store;
use std::path::Path;

pub(crate) fn load_config(data_dir: &Path) -> anyhow::Result<Config> {
    Config::load_with_env(data_dir).context("failed to load config")
}

pub(crate) fn open_store(data_dir: &Path) -> anyhow::Result<Store> {
    Store::open_in(data_dir)
        .with_context(|| format!("failed to open database in {}", data_dir.display()))
}
