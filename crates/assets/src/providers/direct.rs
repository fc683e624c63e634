use std::{
    fs,
    io::{BufWriter, Read, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;

use super::AssetProvider;
use crate::{
    CONFIG_FILENAME, HEAD_TIMEOUT, ensure_parent, http_client, progress::create_progress_bar,
    resolve_url,
};

/// Plain HTTPS download from the `resolve/main` endpoint, bypassing the hub cache.
pub(crate) struct DirectHttpProvider;

impl AssetProvider for DirectHttpProvider {
    fn display_name(&self) -> &'static str {
        "direct HTTPS"
    }

    fn download(&self, repo_id: &str, remote_name: &str, target: &Path) -> Result<PathBuf> {
        if target.exists() && !target.is_file() {
            bail!(
                "download target {} exists but is not a file",
                target.display()
            );
        }
        ensure_parent(target)?;

        let url = resolve_url(repo_id, remote_name);
        fetch_to(http_client()?, &url, remote_name, target)
    }

    fn benchmark(&self, repo_id: &str) -> Option<Duration> {
        let start = Instant::now();
        let response = http_client()
            .ok()?
            .head(resolve_url(repo_id, CONFIG_FILENAME))
            .timeout(HEAD_TIMEOUT)
            .send()
            .ok()?;
        response.status().is_success().then(|| start.elapsed())
    }
}

/// Streams `url` into `target` through a `.download` sibling that is renamed
/// into place once the byte count matches `Content-Length`.
fn fetch_to(client: &Client, url: &str, label: &str, target: &Path) -> Result<PathBuf> {
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to request {url}"))?;
    if !response.status().is_success() {
        bail!("{url} returned HTTP {}", response.status());
    }
    let expected = response.content_length();

    let tmp_path = target.with_extension("download");
    let file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);

    let bar = create_progress_bar(expected, label);
    let streamed = (|| -> Result<u64> {
        let mut downloaded = 0u64;
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let read = response
                .read(&mut buffer)
                .with_context(|| format!("failed to read data from {url}"))?;
            if read == 0 {
                break;
            }
            writer.write_all(&buffer[..read])?;
            downloaded += read as u64;
            bar.inc(read as u64);
        }
        writer.flush()?;
        Ok(downloaded)
    })();
    drop(writer);

    let downloaded = match streamed {
        Ok(downloaded) => downloaded,
        Err(err) => {
            bar.abandon();
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
    };
    if let Some(expected) = expected {
        if downloaded != expected {
            bar.abandon();
            let _ = fs::remove_file(&tmp_path);
            bail!("downloaded {downloaded} bytes but expected {expected} for {label}");
        }
    }
    bar.finish();

    if target.exists() {
        fs::remove_file(target)?;
    }
    fs::rename(&tmp_path, target).with_context(|| {
        format!(
            "failed to move {} into {}",
            tmp_path.display(),
            target.display()
        )
    })?;
    Ok(target.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
        time::Duration,
    };

    use super::*;
    use crate::build_client;

    /// Serves one response whose body arrives in two halves separated by `pause`.
    fn serve_split_body(
        declared: usize,
        first: &'static [u8],
        rest: &'static [u8],
        pause: Duration,
    ) -> Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        thread::spawn(move || -> std::io::Result<()> {
            let (mut stream, _) = listener.accept()?;
            let mut request = [0u8; 2048];
            let _ = stream.read(&mut request)?;
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\nConnection: close\r\n\r\n"
            )?;
            stream.write_all(first)?;
            stream.flush()?;
            thread::sleep(pause);
            stream.write_all(rest)?;
            stream.flush()
        });
        Ok(format!("http://{addr}/model.safetensors"))
    }

    #[test]
    fn slow_body_outlives_the_connect_timeout() -> Result<()> {
        let url = serve_split_body(8, b"weig", b"hts!", Duration::from_millis(600))?;
        let client = build_client(Duration::from_millis(200))?;
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("model.safetensors");

        let path = fetch_to(&client, &url, "model.safetensors", &target)?;
        assert_eq!(path, target);
        assert_eq!(fs::read(&target)?, b"weights!");
        assert!(!target.with_extension("download").exists());
        Ok(())
    }

    #[test]
    fn short_body_is_discarded() -> Result<()> {
        let url = serve_split_body(16, b"part", b"ial", Duration::from_millis(10))?;
        let client = build_client(Duration::from_secs(5))?;
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("model.safetensors");

        assert!(fetch_to(&client, &url, "model.safetensors", &target).is_err());
        assert!(!target.exists());
        assert!(!target.with_extension("download").exists());
        Ok(())
    }
}
