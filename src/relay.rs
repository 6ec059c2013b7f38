// Relay: wait for a just-triggered portal download to land on disk, then
// push the finished file to Dropbox under a fixed remote folder.
//
// Chrome writes an in-progress download as `<name>.crdownload` and
// renames it when done, so "finished" means: a file whose name starts
// with the resolved entry name exists and no longer carries that suffix.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

const UPLOAD_URL: &str = "https://content.dropboxapi.com/2/files/upload";
const REMOTE_FOLDER: &str = "/learnCLI";
const IN_PROGRESS_SUFFIX: &str = "crdownload";
const POLL_LIMIT: u32 = 60;

/// Pushes completed downloads to a Dropbox account. Built once at
/// start-up; `token` is `None` when `d2d.auth` was absent, in which case
/// every relay reports the missing token instead of uploading.
pub struct DropboxRelay {
    client: reqwest::Client,
    upload_url: String,
    token: Option<String>,
    download_dir: PathBuf,
    poll_limit: u32,
}

impl DropboxRelay {
    pub fn new(token: Option<String>, download_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: UPLOAD_URL.to_string(),
            token,
            download_dir,
            poll_limit: POLL_LIMIT,
        }
    }

    #[cfg(test)]
    fn with_endpoint(mut self, url: &str) -> Self {
        self.upload_url = url.to_string();
        self
    }

    /// Relay every resolved download in turn. A failure on one file is
    /// reported and the rest of the batch still proceeds.
    pub async fn relay_all(&self, names: &[String]) {
        for name in names {
            if let Err(e) = self.relay_one(name).await {
                println!("Could not upload {} to dropbox. ({:#})", name, e);
            }
        }
    }

    async fn relay_one(&self, name: &str) -> Result<()> {
        let token = match &self.token {
            Some(token) => token.clone(),
            None => bail!("no Dropbox token ({} missing)", crate::config::AUTH_FILE),
        };

        let path = self.wait_for_download(name).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("downloaded file has no usable name")?
            .to_string();

        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
        spinner.set_message(format!("Dropping {} to Dropbox", path.display()));

        let result = self.upload(&token, &file_name, bytes).await;
        spinner.finish_and_clear();
        result?;

        println!("Dropped {} to Dropbox", path.display());
        Ok(())
    }

    /// Poll the download directory once per second: first until a file
    /// matching `<name>*` appears, then until it has shed the in-progress
    /// suffix. The 60-second cap is cumulative across both phases; on
    /// expiry a timeout is reported and this relay gives up.
    async fn wait_for_download(&self, name: &str) -> Result<PathBuf> {
        let mut waited = 0u32;

        while find_download(&self.download_dir, name).is_none() {
            tokio::time::sleep(Duration::from_secs(1)).await;
            waited += 1;
            if waited == self.poll_limit {
                bail!("Timeout waiting for {} to appear", name);
            }
        }

        loop {
            match find_download(&self.download_dir, name) {
                Some(path) if !is_in_progress(&path) => return Ok(path),
                Some(_) => {}
                None => bail!("download {} disappeared while in progress", name),
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            waited += 1;
            if waited == self.poll_limit {
                bail!("Timeout waiting for {} to finish", name);
            }
        }
    }

    /// Single write-style call against the Dropbox content endpoint.
    /// Overwrites on conflict and suppresses the user notification.
    async fn upload(&self, token: &str, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        let arg = serde_json::json!({
            "path": remote_path(file_name),
            "mode": "overwrite",
            "mute": true,
        });

        let res = self
            .client
            .post(&self.upload_url)
            .bearer_auth(token)
            .header("Dropbox-API-Arg", arg.to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .context("Failed to send upload request")?;

        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().await.unwrap_or_else(|_| "".into());
            anyhow::bail!("Upload failed: {} - {}", status, txt);
        }
        Ok(())
    }
}

/// Remote destination for a relayed file, independent of where the local
/// download directory lives.
fn remote_path(file_name: &str) -> String {
    format!("{}/{}", REMOTE_FOLDER, file_name)
}

/// First file in `dir` whose name starts with `name`, in directory-entry
/// name order so repeated polls see the same match.
fn find_download(dir: &Path, name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(name))
                .unwrap_or(false)
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

fn is_in_progress(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == IN_PROGRESS_SUFFIX)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_path_is_fixed_folder_plus_name() {
        assert_eq!(remote_path("report.pdf"), "/learnCLI/report.pdf");
    }

    #[test]
    fn find_download_matches_on_name_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"x").unwrap();

        let found = find_download(dir.path(), "report").unwrap();
        assert_eq!(found.file_name().unwrap(), "report.pdf");
        assert!(find_download(dir.path(), "missing").is_none());
    }

    #[test]
    fn in_progress_suffix_is_detected() {
        assert!(is_in_progress(Path::new("/tmp/report.pdf.crdownload")));
        assert!(!is_in_progress(Path::new("/tmp/report.pdf")));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_times_out_after_sixty_one_second_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let relay = DropboxRelay::new(Some("token".into()), dir.path().to_path_buf());

        let started = tokio::time::Instant::now();
        let err = relay.wait_for_download("never-appears").await.unwrap_err();

        assert!(err.to_string().contains("Timeout"));
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_download_is_returned_without_waiting_out_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"done").unwrap();
        let relay = DropboxRelay::new(Some("token".into()), dir.path().to_path_buf());

        let path = relay.wait_for_download("report").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "report.pdf");
    }

    #[tokio::test]
    async fn upload_hits_the_content_endpoint_with_overwrite_mode() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2/files/upload")
            .match_header("authorization", "Bearer token")
            .match_header(
                "Dropbox-API-Arg",
                r#"{"path":"/learnCLI/report.pdf","mode":"overwrite","mute":true}"#,
            )
            .match_header("content-type", "application/octet-stream")
            .match_body("file bytes")
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let relay = DropboxRelay::new(Some("token".into()), dir.path().to_path_buf())
            .with_endpoint(&format!("{}/2/files/upload", server.url()));

        relay
            .upload("token", "report.pdf", b"file bytes".to_vec())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_failure_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/files/upload")
            .with_status(401)
            .with_body("invalid token")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let relay = DropboxRelay::new(Some("token".into()), dir.path().to_path_buf())
            .with_endpoint(&format!("{}/2/files/upload", server.url()));

        let err = relay
            .upload("token", "report.pdf", b"x".to_vec())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid token"));
    }

    #[tokio::test]
    async fn relay_without_token_reports_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"x").unwrap();
        let relay = DropboxRelay::new(None, dir.path().to_path_buf());

        let err = relay.relay_one("report").await.unwrap_err();
        assert!(err.to_string().contains("no Dropbox token"));
    }
}
