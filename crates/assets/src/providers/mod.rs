use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Result;

mod direct;
mod hugging_face;

pub(crate) use direct::DirectHttpProvider;
pub(crate) use hugging_face::HuggingFaceProvider;

pub(crate) trait AssetProvider: Sync {
    fn display_name(&self) -> &'static str;
    fn download(&self, repo_id: &str, remote_name: &str, target: &Path) -> Result<PathBuf>;
    /// Round-trip latency to the provider for `repo_id`, `None` when unreachable.
    fn benchmark(&self, repo_id: &str) -> Option<Duration>;
}

static HUGGING_FACE_PROVIDER: HuggingFaceProvider = HuggingFaceProvider;
static DIRECT_PROVIDER: DirectHttpProvider = DirectHttpProvider;
static PROVIDERS: [&'static dyn AssetProvider; 2] = [&HUGGING_FACE_PROVIDER, &DIRECT_PROVIDER];

/// Reachable providers first, fastest first; unreachable ones are still tried last.
pub(crate) fn providers_in_download_order(repo_id: &str) -> Vec<&'static dyn AssetProvider> {
    let mut measured: Vec<(&'static dyn AssetProvider, Option<Duration>)> = PROVIDERS
        .iter()
        .copied()
        .map(|provider| (provider, provider.benchmark(repo_id)))
        .collect();
    measured.sort_by(|a, b| compare_latency(a.1, b.1));
    measured.into_iter().map(|(provider, _)| provider).collect()
}

pub(crate) fn compare_latency(a: Option<Duration>, b: Option<Duration>) -> Ordering {
    match (a, b) {
        (Some(la), Some(lb)) => la.cmp(&lb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub(crate) fn announce_provider(
    provider: &dyn AssetProvider,
    repo_id: &str,
    remote: &str,
    target: &Path,
) {
    tracing::info!(
        "Downloading {remote} from {repo_id} via {} -> {}",
        provider.display_name(),
        target.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reachable_providers_sort_first() {
        let fast = Some(Duration::from_millis(5));
        let slow = Some(Duration::from_millis(50));
        assert_eq!(compare_latency(fast, slow), Ordering::Less);
        assert_eq!(compare_latency(None, slow), Ordering::Greater);
        assert_eq!(compare_latency(None, None), Ordering::Equal);
    }
}
