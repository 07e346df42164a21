//! The download worker: sole consumer of the request queue.
//!
//! One worker lives for the whole process. It runs one conversion pass over
//! whatever is already staged, then handles requests one at a time: download
//! into staging, then a full scan/plan/execute pass over the entire staging
//! directory. At most one download and one ffmpeg run are in flight at once.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use tf_av::Downloader;
use tf_core::config::ConversionConfig;
use tf_core::DownloadRequest;

use crate::executor::{BatchExecutor, BatchOutcome};
use crate::queue::RequestReceiver;

pub struct Worker {
    receiver: RequestReceiver,
    downloader: Arc<dyn Downloader>,
    executor: BatchExecutor,
    conversion: ConversionConfig,
    subtitle_language: String,
}

impl Worker {
    pub fn new(
        receiver: RequestReceiver,
        downloader: Arc<dyn Downloader>,
        executor: BatchExecutor,
        conversion: ConversionConfig,
        subtitle_language: impl Into<String>,
    ) -> Self {
        Self {
            receiver,
            downloader,
            executor,
            conversion,
            subtitle_language: subtitle_language.into(),
        }
    }

    /// Run until `cancel` fires or every sender is dropped.
    ///
    /// Cancellation is only observed while waiting for the next request; a
    /// download or batch already under way runs to completion. Requests still
    /// queued at cancellation are dropped.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            staging = %self.executor.dirs().staging_dir.display(),
            output = %self.executor.dirs().output_dir.display(),
            "Worker started"
        );

        self.convert_staged().await;

        while let Some(request) = self.receiver.pop(&cancel).await {
            self.handle(request).await;
        }

        if cancel.is_cancelled() {
            tracing::info!(pending = self.receiver.len(), "Worker interrupted");
        } else {
            tracing::info!("Request queue closed; worker exiting");
        }
    }

    async fn handle(&self, request: DownloadRequest) {
        let tracks = request.track_spec();
        if tracks.is_empty() {
            tracing::warn!(media_id = %request.media_id, "Request asks for neither audio nor video; ignoring");
            return;
        }

        let lang = request
            .want_subtitles
            .then_some(self.subtitle_language.as_str());
        tracing::info!(media_id = %request.media_id, %tracks, subtitles = ?lang, "Downloading");

        let ids = [request.media_id.clone()];
        if let Err(e) = self.downloader.download(&ids, tracks, lang).await {
            tracing::warn!(media_id = %request.media_id, "Download failed: {e}");
            return;
        }

        self.convert_staged().await;
    }

    /// One scan/plan/execute pass over the whole staging directory.
    pub async fn run_batch_pass(&self) -> tf_core::Result<BatchOutcome> {
        self.executor.run_pass(&self.conversion).await
    }

    /// Failures are logged; whatever is left in staging is picked up by the
    /// next pass.
    async fn convert_staged(&self) {
        match self.run_batch_pass().await {
            Ok(BatchOutcome::Converted { outputs, cleared }) => {
                tracing::info!(outputs, cleared, "Batch pass complete");
            }
            Ok(BatchOutcome::Skipped) => {}
            Err(e) => tracing::error!("Batch pass failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tf_core::config::DirsConfig;
    use tf_core::{Error, TrackSpec};

    use crate::queue::request_queue;

    type Call = (Vec<String>, TrackSpec, Option<String>);

    /// Records calls and drops a fake media file into staging.
    struct FakeDownloader {
        staging: std::path::PathBuf,
        calls: Mutex<Vec<Call>>,
        fail_ids: Vec<String>,
    }

    impl FakeDownloader {
        fn new(staging: &std::path::Path) -> Self {
            Self {
                staging: staging.to_path_buf(),
                calls: Mutex::new(Vec::new()),
                fail_ids: Vec::new(),
            }
        }

        fn calls(&self) -> Vec<Call> {
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
            self.calls.lock().unwrap().push((
                media_ids.to_vec(),
                tracks,
                subtitle_language.map(str::to_string),
            ));
            let id = &media_ids[0];
            if self.fail_ids.contains(id) {
                return Err(Error::download(id, "HTTP Error 404"));
            }
            let name = format!("{tracks}_Title-{id}.mkv");
            std::fs::write(self.staging.join(name), b"media")?;
            Ok(())
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        dirs: DirsConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let dirs = DirsConfig::new(tmp.path().join("staging"), tmp.path().join("output"));
            dirs.ensure().unwrap();
            Self { _tmp: tmp, dirs }
        }

        fn worker(&self, program: &str, receiver: RequestReceiver, dl: Arc<FakeDownloader>) -> Worker {
            let executor = BatchExecutor::new(program, self.dirs.clone())
                .with_timeout(Duration::from_secs(10));
            Worker::new(receiver, dl, executor, ConversionConfig::default(), "en")
        }

        fn staged(&self) -> usize {
            std::fs::read_dir(&self.dirs.staging_dir).unwrap().count()
        }
    }

    #[tokio::test]
    async fn request_is_downloaded_with_its_track_spec() {
        let fx = Fixture::new();
        let dl = Arc::new(FakeDownloader::new(&fx.dirs.staging_dir));
        let (tx, rx) = request_queue();

        tx.push(DownloadRequest::new("abc123", true, false, true)).unwrap();
        tx.push(DownloadRequest::new("def456", false, true, false)).unwrap();
        drop(tx);

        fx.worker("nonexistent_tool_xyz_12345", rx, dl.clone())
            .run(CancellationToken::new())
            .await;

        let calls = dl.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, ["abc123"]);
        assert_eq!(calls[0].1.as_str(), "v");
        assert_eq!(calls[0].2.as_deref(), Some("en"));
        assert_eq!(calls[1].0, ["def456"]);
        assert_eq!(calls[1].1.as_str(), "a");
        assert_eq!(calls[1].2, None);
    }

    #[tokio::test]
    async fn empty_track_spec_is_never_downloaded() {
        let fx = Fixture::new();
        let dl = Arc::new(FakeDownloader::new(&fx.dirs.staging_dir));
        let (tx, rx) = request_queue();

        tx.push(DownloadRequest::new("nothing", false, false, true)).unwrap();
        drop(tx);

        fx.worker("nonexistent_tool_xyz_12345", rx, dl.clone())
            .run(CancellationToken::new())
            .await;
        assert!(dl.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_download_does_not_stop_the_loop() {
        let fx = Fixture::new();
        let mut fake = FakeDownloader::new(&fx.dirs.staging_dir);
        fake.fail_ids.push("gone".into());
        let dl = Arc::new(fake);
        let (tx, rx) = request_queue();

        tx.push(DownloadRequest::new("gone", true, true, false)).unwrap();
        tx.push(DownloadRequest::new("next", true, true, false)).unwrap();
        drop(tx);

        fx.worker("nonexistent_tool_xyz_12345", rx, dl.clone())
            .run(CancellationToken::new())
            .await;

        let ids: Vec<_> = dl.calls().into_iter().map(|c| c.0[0].clone()).collect();
        assert_eq!(ids, ["gone", "next"]);
        // The transcoder could not be spawned, so the download is kept for retry.
        assert_eq!(fx.staged(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_pass_clears_staging() {
        let fx = Fixture::new();
        std::fs::write(fx.dirs.staging_dir.join("a_Leftover-old.m4a"), b"").unwrap();
        let dl = Arc::new(FakeDownloader::new(&fx.dirs.staging_dir));
        let (tx, rx) = request_queue();

        tx.push(DownloadRequest::new("new1", true, true, false)).unwrap();
        drop(tx);

        fx.worker("true", rx, dl.clone()).run(CancellationToken::new()).await;

        assert_eq!(dl.calls().len(), 1);
        assert_eq!(fx.staged(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn startup_pass_converts_leftovers() {
        let fx = Fixture::new();
        std::fs::write(fx.dirs.staging_dir.join("v_Leftover-old.mkv"), b"").unwrap();
        let dl = Arc::new(FakeDownloader::new(&fx.dirs.staging_dir));
        let (tx, rx) = request_queue();
        drop(tx);

        fx.worker("true", rx, dl.clone()).run(CancellationToken::new()).await;

        assert!(dl.calls().is_empty());
        assert_eq!(fx.staged(), 0);
    }

    #[tokio::test]
    async fn cancellation_stops_without_draining() {
        let fx = Fixture::new();
        let dl = Arc::new(FakeDownloader::new(&fx.dirs.staging_dir));
        let (tx, rx) = request_queue();
        tx.push(DownloadRequest::new("queued", true, false, false)).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        fx.worker("nonexistent_tool_xyz_12345", rx, dl.clone())
            .run(cancel)
            .await;

        assert!(dl.calls().is_empty());
        drop(tx);
    }

    #[tokio::test]
    async fn worker_waits_until_cancelled() {
        let fx = Fixture::new();
        let dl = Arc::new(FakeDownloader::new(&fx.dirs.staging_dir));
        let (tx, rx) = request_queue();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            fx.worker("nonexistent_tool_xyz_12345", rx, dl.clone())
                .run(cancel.clone()),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
        drop(tx);
    }
}
