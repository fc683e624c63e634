pub mod config;
pub mod fs;

pub use config::{
    AppConfig, BenchmarkOverride, BenchmarkSettings, ConfigDescriptor, ConfigOverride,
    ConfigOverrides, DEFAULT_MODEL_ID, ModelEntry, ModelRegistry, ModelResources,
    ResourceLocation, VideoOverride, VideoSettings,
};
pub use fs::{LocalFileSystem, Namespace, VirtualFileSystem, VirtualPath};
