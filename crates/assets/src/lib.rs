mod progress;
mod providers;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow, bail};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use providers::providers_in_download_order;

pub const CONFIG_FILENAME: &str = "config.json";
pub const WEIGHTS_FILENAME: &str = "model.safetensors";

const HUB_BASE_URL: &str = "https://huggingface.co";
const HTTP_USER_AGENT: &str = concat!("vggt-probe/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Bound for metadata requests; body transfers of large checkpoints are unbounded.
const HEAD_TIMEOUT: Duration = Duration::from_secs(30);

static HTTP_CLIENT: OnceCell<Client> = OnceCell::new();

/// Download URL of `file` at the head of `repo_id`'s main branch.
pub fn resolve_url(repo_id: &str, file: &str) -> String {
    format!(
        "{HUB_BASE_URL}/{}/resolve/main/{}",
        repo_id.trim_matches('/'),
        file.trim_start_matches('/')
    )
}

pub fn ensure_model_config(repo_id: &str, target: &Path) -> Result<PathBuf> {
    ensure_asset(repo_id, CONFIG_FILENAME, target)
}

pub fn ensure_model_weights(repo_id: &str, target: &Path) -> Result<PathBuf> {
    ensure_asset(repo_id, WEIGHTS_FILENAME, target)
}

/// A custom weights path must already exist; otherwise the default target is
/// filled from `repo_id`.
pub fn resolve_weights(
    custom: Option<&Path>,
    repo_id: &str,
    default_path: &Path,
) -> Result<PathBuf> {
    if let Some(path) = custom {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(anyhow!(
            "weights not found at custom path {}",
            path.display()
        ));
    }
    ensure_model_weights(repo_id, default_path)
}

fn ensure_asset(repo_id: &str, remote: &str, target: &Path) -> Result<PathBuf> {
    if target.exists() {
        return Ok(target.to_path_buf());
    }
    download_asset(repo_id, remote, target)
}

fn download_asset(repo_id: &str, remote_name: &str, target: &Path) -> Result<PathBuf> {
    let mut last_err: Option<anyhow::Error> = None;
    for provider in providers_in_download_order(repo_id) {
        providers::announce_provider(provider, repo_id, remote_name, target);
        match provider.download(repo_id, remote_name, target) {
            Ok(path) => return Ok(path),
            Err(err) => {
                tracing::warn!(
                    "{} could not provide {remote_name}: {err:#}",
                    provider.display_name()
                );
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        anyhow!("failed to download {remote_name} using any configured provider")
    }))
}

pub(crate) fn copy_to_target(cached: &Path, target: &Path) -> Result<()> {
    ensure_parent(target)?;

    if target.exists() && !target.is_file() {
        bail!(
            "download target {} exists but is not a file",
            target.display()
        );
    }

    if target != cached {
        std::fs::copy(cached, target).with_context(|| {
            format!(
                "failed to copy cached file {} to {}",
                cached.display(),
                target.display()
            )
        })?;
    }

    Ok(())
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

pub(crate) fn http_client() -> Result<&'static Client> {
    HTTP_CLIENT.get_or_try_init(|| build_client(CONNECT_TIMEOUT))
}

pub(crate) fn build_client(connect_timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(None::<Duration>)
        .user_agent(HTTP_USER_AGENT)
        .build()
        .context("failed to build HTTP client")
}
