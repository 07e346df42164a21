//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns temporary staging/output directories
//! and a real request queue. [`TestHarness::with_server`] starts the intake
//! router on a random port; [`TestHarness::spawn_worker`] runs the worker
//! against a [`FakeDownloader`] and a stand-in transcoder script.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tf_av::Downloader;
use tf_core::config::{ConversionConfig, DirsConfig};
use tf_core::{Error, TrackSpec};
use tf_pipeline::{request_queue, BatchExecutor, RequestReceiver, RequestSender, Worker};
use tf_server::context::AppContext;
use tf_server::router::build_router;

/// One recorded `Downloader::download` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCall {
    pub media_ids: Vec<String>,
    pub tracks: String,
    pub subtitle_language: Option<String>,
}

/// Downloader that writes `{spec}_Title-{id}.webm` (plus a `.en.vtt` sidecar
/// when subtitles are asked for) into staging instead of hitting the network.
pub struct FakeDownloader {
    staging: PathBuf,
    calls: Mutex<Vec<DownloadCall>>,
}

impl FakeDownloader {
    pub fn new(staging: &Path) -> Self {
        Self {
            staging: staging.to_path_buf(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<DownloadCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(
        &self,
        media_ids: &[String],
        tracks: TrackSpec,
        subtitle_language: Option<&str>,
    ) -> tf_core::Result<()> {
        self.calls.lock().unwrap().push(DownloadCall {
            media_ids: media_ids.to_vec(),
            tracks: tracks.as_str().to_string(),
            subtitle_language: subtitle_language.map(str::to_string),
        });

        for id in media_ids {
            if id.starts_with("fail") {
                return Err(Error::download(id, "Video unavailable"));
            }
            let base = format!("{tracks}_Title-{id}");
            std::fs::write(self.staging.join(format!("{base}.webm")), b"media")?;
            if let Some(lang) = subtitle_language {
                std::fs::write(self.staging.join(format!("{base}.{lang}.vtt")), b"WEBVTT")?;
            }
        }
        Ok(())
    }
}

/// Test harness owning temp directories and the request queue.
pub struct TestHarness {
    pub tmp: tempfile::TempDir,
    pub dirs: DirsConfig,
    pub sender: RequestSender,
    receiver: Option<RequestReceiver>,
}

impl TestHarness {
    /// Fresh, empty staging and output directories under a temp root.
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let dirs = DirsConfig::new(tmp.path().join("staging"), tmp.path().join("output"));
        dirs.ensure().expect("failed to create dirs");
        let (sender, receiver) = request_queue();

        Self {
            tmp,
            dirs,
            sender,
            receiver: Some(receiver),
        }
    }

    /// Start the intake router on a random port and return the harness
    /// together with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let app = build_router(AppContext::new(harness.sender.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Take the consumer end of the queue for direct inspection.
    pub fn receiver(&mut self) -> RequestReceiver {
        self.receiver.take().expect("receiver already taken")
    }

    /// Write a script that stands in for ffmpeg: it logs its arguments to
    /// `ffmpeg-args.txt` and exits with `exit_code`.
    #[cfg(unix)]
    pub fn fake_ffmpeg(&self, exit_code: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = self.tmp.path().join("ffmpeg");
        let log = self.tmp.path().join("ffmpeg-args.txt");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nfor a in \"$@\"; do echo \"$a\" >> '{}'; done\nexit {exit_code}\n",
                log.display()
            ),
        )
        .expect("failed to write fake ffmpeg");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("failed to chmod fake ffmpeg");
        script
    }

    /// Arguments the fake ffmpeg received, one per line, across all runs.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.tmp.path().join("ffmpeg-args.txt"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Spawn the worker with the given transcoder and a [`FakeDownloader`].
    pub fn spawn_worker(
        &mut self,
        ffmpeg: &Path,
        cancel: CancellationToken,
    ) -> (Arc<FakeDownloader>, JoinHandle<()>) {
        let downloader = Arc::new(FakeDownloader::new(&self.dirs.staging_dir));
        let executor = BatchExecutor::new(ffmpeg, self.dirs.clone());
        let worker = Worker::new(
            self.receiver(),
            downloader.clone(),
            executor,
            ConversionConfig::default(),
            "en",
        );
        (downloader, tokio::spawn(worker.run(cancel)))
    }

    pub fn staged(&self) -> Vec<String> {
        list(&self.dirs.staging_dir)
    }
}

fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("failed to read dir")
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
