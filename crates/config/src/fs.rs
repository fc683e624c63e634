use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

pub const CONFIG_DIR_ENV: &str = "VGGT_PROBE_CONFIG_DIR";
pub const CACHE_DIR_ENV: &str = "VGGT_PROBE_CACHE_DIR";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Namespace {
    Config,
    Cache,
}

/// Location relative to one of the application roots.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct VirtualPath {
    namespace: Namespace,
    segments: Vec<String>,
}

impl VirtualPath {
    pub fn new(namespace: Namespace, segments: Vec<String>) -> Self {
        Self {
            namespace,
            segments,
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self::new(self.namespace, segments)
    }

    pub fn config_file() -> Self {
        Self::new(Namespace::Config, vec!["config.toml".into()])
    }

    /// Cache directory holding the checkpoint files of `model_id`.
    pub fn model_dir(model_id: &str) -> Self {
        Self::new(Namespace::Cache, vec!["models".into(), model_id.into()])
    }

    pub fn model_config(model_id: &str) -> Self {
        Self::model_dir(model_id).join("config.json")
    }

    pub fn model_weights(model_id: &str) -> Self {
        Self::model_dir(model_id).join("model.safetensors")
    }
}

pub trait VirtualFileSystem {
    fn read(&self, path: &VirtualPath) -> Result<Vec<u8>>;
    fn write(&self, path: &VirtualPath, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &VirtualPath) -> Result<bool>;
    fn ensure_parent(&self, path: &VirtualPath) -> Result<()>;

    fn with_physical_path<F, T>(&self, path: &VirtualPath, func: F) -> Result<T>
    where
        F: FnOnce(&Path) -> Result<T>;
}

/// Maps virtual paths onto the platform config and cache directories.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    config_root: PathBuf,
    cache_root: PathBuf,
}

impl LocalFileSystem {
    /// Roots default to `<platform dir>/<app_name>` and honour the
    /// `VGGT_PROBE_CONFIG_DIR` / `VGGT_PROBE_CACHE_DIR` overrides.
    pub fn new(app_name: &str) -> Self {
        let config_root = env::var_os(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| platform_dir(dirs::config_dir(), ".config", app_name));
        let cache_root = env::var_os(CACHE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| platform_dir(dirs::cache_dir(), ".cache", app_name));
        Self {
            config_root,
            cache_root,
        }
    }

    pub fn with_directories(config_root: PathBuf, cache_root: PathBuf) -> Self {
        Self {
            config_root,
            cache_root,
        }
    }

    pub fn physical(&self, path: &VirtualPath) -> PathBuf {
        let root = match path.namespace() {
            Namespace::Config => &self.config_root,
            Namespace::Cache => &self.cache_root,
        };
        path.segments()
            .iter()
            .fold(root.clone(), |buf, segment| buf.join(segment))
    }
}

impl VirtualFileSystem for LocalFileSystem {
    fn read(&self, path: &VirtualPath) -> Result<Vec<u8>> {
        let physical = self.physical(path);
        fs::read(&physical).with_context(|| format!("failed to read {}", physical.display()))
    }

    fn write(&self, path: &VirtualPath, contents: &[u8]) -> Result<()> {
        self.ensure_parent(path)?;
        let physical = self.physical(path);
        fs::write(&physical, contents)
            .with_context(|| format!("failed to write {}", physical.display()))
    }

    fn exists(&self, path: &VirtualPath) -> Result<bool> {
        Ok(self.physical(path).exists())
    }

    fn ensure_parent(&self, path: &VirtualPath) -> Result<()> {
        let physical = self.physical(path);
        if let Some(parent) = physical.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        Ok(())
    }

    fn with_physical_path<F, T>(&self, path: &VirtualPath, func: F) -> Result<T>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        func(&self.physical(path))
    }
}

fn platform_dir(base: Option<PathBuf>, fallback: &str, app_name: &str) -> PathBuf {
    base.unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(fallback)
    })
    .join(app_name)
}
