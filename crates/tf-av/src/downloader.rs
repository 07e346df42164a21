//! Downloader boundary: fetch media and subtitle sidecars into staging.
//!
//! The [`Downloader`] trait is what the worker talks to. [`YtDlpDownloader`]
//! is the production backend; it names every file `{spec}_{title}-{id}.{ext}`
//! and, when a language is requested, leaves subtitle sidecars named
//! `{base}.{lang}.{ext}` next to it. After a successful run it records a
//! [`StagedManifest`] for each media file it produced.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use tf_core::config::DownloadConfig;
use tf_core::media::is_input_file;
use tf_core::{Error, StagedManifest, TrackSpec};

use crate::command::ToolCommand;

/// Fetches media into the staging directory.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download every id in `media_ids` with the given track spec.
    ///
    /// When `subtitle_language` is set, a subtitle sidecar in that language
    /// is requested as well.
    async fn download(
        &self,
        media_ids: &[String],
        tracks: TrackSpec,
        subtitle_language: Option<&str>,
    ) -> tf_core::Result<()>;
}

/// [`Downloader`] backed by the yt-dlp CLI.
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    program: PathBuf,
    staging_dir: PathBuf,
    config: DownloadConfig,
    timeout: Duration,
}

impl YtDlpDownloader {
    pub fn new(program: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>, config: DownloadConfig) -> Self {
        Self {
            program: program.into(),
            staging_dir: staging_dir.into(),
            config,
            timeout: Duration::from_secs(60 * 60),
        }
    }

    /// Builder: cap the run time of one yt-dlp invocation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Assemble the yt-dlp invocation for one call.
    pub fn build_command(
        &self,
        media_ids: &[String],
        tracks: TrackSpec,
        subtitle_language: Option<&str>,
    ) -> ToolCommand {
        let format = if tracks.video {
            "bestvideo+bestaudio"
        } else {
            "bestaudio"
        };
        let template = self
            .staging_dir
            .join(format!("{}_%(title)s-%(id)s.%(ext)s", tracks.as_str()));

        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.timeout(self.timeout)
            .args(["--no-progress", "-f", format])
            .arg("-o")
            .arg(template.to_string_lossy());

        if let Some(lang) = subtitle_language {
            cmd.args(["--write-subs", "--sub-langs", lang]);
        }

        cmd.arg("--");
        cmd.args(media_ids.iter().map(|id| self.config.url_for(id)));
        cmd
    }

    /// Write a manifest for every staged media file produced for `media_ids`.
    ///
    /// Returns the media files that received one.
    pub fn record_manifests(
        &self,
        media_ids: &[String],
        tracks: TrackSpec,
        subtitle_language: Option<&str>,
    ) -> tf_core::Result<Vec<PathBuf>> {
        let mut recorded = Vec::new();
        let prefix = format!("{}_", tracks.as_str());

        for entry in std::fs::read_dir(&self.staging_dir)? {
            let path = entry?.path();
            if !path.is_file() || !is_input_file(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(output_stem) = stem.strip_prefix(&prefix) else {
                continue;
            };
            let Some(media_id) = media_ids
                .iter()
                .find(|id| output_stem.ends_with(&format!("-{id}")))
            else {
                continue;
            };

            let manifest = StagedManifest {
                media_id: media_id.clone(),
                tracks,
                subtitle_language: subtitle_language.map(str::to_string),
                output_stem: output_stem.to_string(),
            };
            manifest.write_for(&path)?;
            tracing::debug!(file = %path.display(), media_id = %media_id, "Recorded manifest");
            recorded.push(path);
        }

        Ok(recorded)
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(
        &self,
        media_ids: &[String],
        tracks: TrackSpec,
        subtitle_language: Option<&str>,
    ) -> tf_core::Result<()> {
        if media_ids.is_empty() {
            return Ok(());
        }
        let joined = media_ids.join(",");

        let cmd = self.build_command(media_ids, tracks, subtitle_language);
        tracing::info!(
            media_id = %joined,
            tracks = %tracks,
            subtitles = ?subtitle_language,
            "Starting download"
        );
        tracing::debug!("yt-dlp command: {}", cmd.display());

        cmd.execute()
            .await
            .map_err(|e| Error::download(&joined, e.to_string()))?;

        let recorded = self
            .record_manifests(media_ids, tracks, subtitle_language)
            .map_err(|e| Error::download(&joined, format!("recording manifests: {e}")))?;
        tracing::info!(media_id = %joined, files = recorded.len(), "Download finished");
        Ok(())
    }
}

/// Extract the media id from a watch link.
///
/// Uses the `v` query parameter, then the path of a short link; anything
/// else is returned unchanged so that bare ids pass through.
pub fn media_id_from_link(link: &str) -> String {
    let Ok(url) = Url::parse(link) else {
        return link.to_string();
    };

    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        return v.into_owned();
    }

    if url.host_str() == Some("youtu.be") {
        if let Some(id) = url.path_segments().and_then(|mut s| s.next()) {
            if !id.is_empty() {
                return id.to_string();
            }
        }
    }

    link.to_string()
}

/// Media ids from a download list file, grouped by track spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadList {
    pub audio: Vec<String>,
    pub video: Vec<String>,
    pub audio_video: Vec<String>,
}

impl DownloadList {
    /// Parse a list file.
    ///
    /// Only lines mentioning `youtube.com` are considered. A line is either
    /// `<link>` (video only, or audio only when `default_to_audio` is set) or
    /// `<spec> <link>` where spec is one of `a`, `v`, `av`, `va`.
    pub fn parse(contents: &str, default_to_audio: bool) -> tf_core::Result<Self> {
        let mut list = Self::default();

        for line in contents.lines().map(str::trim).filter(|l| l.contains("youtube.com")) {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let (tracks, link) = match parts.as_slice() {
                [link] if default_to_audio => (TrackSpec::new(true, false), *link),
                [link] => (TrackSpec::new(false, true), *link),
                [spec, link] if matches!(*spec, "a" | "v" | "av" | "va") => {
                    (TrackSpec::from_token(spec), *link)
                }
                [spec, _] => {
                    return Err(Error::Validation(format!(
                        "download spec should be one of a, v, av, va; got '{spec}' in line: {line}"
                    )))
                }
                _ => {
                    return Err(Error::Validation(format!(
                        "expected '[spec] <link>'; got: {line}"
                    )))
                }
            };

            let id = media_id_from_link(link);
            match (tracks.audio, tracks.video) {
                (true, true) => list.audio_video.push(id),
                (true, false) => list.audio.push(id),
                _ => list.video.push(id),
            }
        }

        Ok(list)
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.audio.len() + self.video.len() + self.audio_video.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Download every group in the order audio, video, audio+video.
    ///
    /// Audio-only downloads never request subtitles. A failing group is
    /// logged and does not stop the remaining groups; the number of failed
    /// groups is returned.
    pub async fn download_all(
        &self,
        downloader: &dyn Downloader,
        subtitle_language: Option<&str>,
    ) -> usize {
        let groups = [
            (&self.audio, TrackSpec::new(true, false), None),
            (&self.video, TrackSpec::new(false, true), subtitle_language),
            (&self.audio_video, TrackSpec::new(true, true), subtitle_language),
        ];

        let mut failed = 0;
        for (ids, tracks, lang) in groups {
            if ids.is_empty() {
                continue;
            }
            if let Err(e) = downloader.download(ids, tracks, lang).await {
                tracing::warn!(tracks = %tracks, "Download failed: {e}");
                failed += 1;
            }
        }
        failed
    }
}
