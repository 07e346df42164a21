//! Per-file conversion plan.
//!
//! A [`ConversionPlan`] is built for every staged media file at the start of
//! a batch pass. It works out which outputs the file should produce, which
//! subtitle sidecar (if any) belongs to it, where the outputs go, and which
//! arguments it adds to the shared ffmpeg command.
//!
//! Intent comes from the file's [`StagedManifest`] when the downloader left
//! one, otherwise from the filename's track-spec prefix (`av_Title-id.webm`).

use std::path::{Path, PathBuf};

use tf_core::config::{ConversionConfig, DirsConfig};
use tf_core::media::{AUDIO_OUTPUT_EXTENSION, VIDEO_OUTPUT_EXTENSION};
use tf_core::{Error, StagedManifest, SubtitleFormat, TrackSpec};

use crate::scanner::scan_staging;

/// Separator between the track-spec prefix and the rest of a staged name.
const PREFIX_SEPARATOR: char = '_';

/// Codec requested for subtitles muxed into the video container.
const SUBTITLE_CODEC: &str = "mov_text";

/// Absolute source path plus the outputs it should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub path: PathBuf,
    pub wants_video: bool,
    pub wants_audio: bool,
}

/// A subtitle sidecar matched to a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub path: PathBuf,
    pub format: SubtitleFormat,
}

/// Destination paths; each is present iff that output is wanted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPaths {
    pub video: Option<PathBuf>,
    pub audio: Option<PathBuf>,
}

/// Conversion plan for one staged source file.
#[derive(Debug, Clone)]
pub struct ConversionPlan {
    source_filename: String,
    skip_if_output_exists: bool,
    remux_only: bool,
    subtitle_language: String,
    dirs: DirsConfig,
    manifest: Option<StagedManifest>,
}

impl ConversionPlan {
    /// Build the plan for `source_filename` inside the staging directory.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the source is not a regular file right now.
    ///
    /// A manifest that cannot be read or parsed is logged and ignored, so the
    /// plan falls back to the filename prefix.
    pub fn new(
        dirs: &DirsConfig,
        source_filename: impl Into<String>,
        policy: &ConversionConfig,
    ) -> tf_core::Result<Self> {
        let source_filename = source_filename.into();
        let source_path = dirs.staging_dir.join(&source_filename);
        if !source_path.is_file() {
            return Err(Error::not_found("source file", &source_filename));
        }
        let manifest = match StagedManifest::load_for(&source_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!(file = %source_filename, "Ignoring unreadable manifest: {e}");
                None
            }
        };

        Ok(Self {
            source_filename,
            skip_if_output_exists: policy.skip_if_output_exists,
            remux_only: policy.remux_only,
            subtitle_language: policy.subtitle_language.clone(),
            dirs: dirs.clone(),
            manifest,
        })
    }

    /// Scan staging and build a plan for every file found, in scan order.
    ///
    /// Plans are built eagerly: the first failure aborts the whole set.
    pub fn plan_staging(
        dirs: &DirsConfig,
        policy: &ConversionConfig,
    ) -> tf_core::Result<Vec<Self>> {
        scan_staging(&dirs.staging_dir)?
            .into_iter()
            .map(|name| Self::new(dirs, name, policy))
            .collect()
    }

    pub fn source_filename(&self) -> &str {
        &self.source_filename
    }

    pub fn skip_if_output_exists(&self) -> bool {
        self.skip_if_output_exists
    }

    pub fn remux_only(&self) -> bool {
        self.remux_only
    }

    /// Manifest the downloader recorded for this file, if any.
    pub fn manifest(&self) -> Option<&StagedManifest> {
        self.manifest.as_ref()
    }

    fn source_path(&self) -> PathBuf {
        self.dirs.staging_dir.join(&self.source_filename)
    }

    /// Filename without its extension.
    fn source_stem(&self) -> &str {
        Path::new(&self.source_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.source_filename)
    }

    /// Wanted tracks: manifest first, then the prefix before the first `_`.
    ///
    /// A name without a separator carries no prefix and wants nothing.
    pub fn track_spec(&self) -> TrackSpec {
        if let Some(ref manifest) = self.manifest {
            return manifest.tracks;
        }
        self.source_stem()
            .split_once(PREFIX_SEPARATOR)
            .map(|(token, _)| TrackSpec::from_token(token))
            .unwrap_or_default()
    }

    /// Output basename without extension.
    fn output_stem(&self) -> Option<String> {
        if let Some(ref manifest) = self.manifest {
            return Some(manifest.output_stem.clone());
        }
        self.source_stem()
            .split_once(PREFIX_SEPARATOR)
            .map(|(_, rest)| rest.to_string())
    }

    /// Absolute source path and the outputs it should produce.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the source has disappeared since construction.
    pub fn resolve_source(&self) -> tf_core::Result<ResolvedSource> {
        let path = self.source_path();
        if !path.is_file() {
            return Err(Error::not_found("source file", &self.source_filename));
        }
        let tracks = self.track_spec();
        Ok(ResolvedSource {
            path,
            wants_video: tracks.video,
            wants_audio: tracks.audio,
        })
    }

    /// Find the subtitle sidecar for this source.
    ///
    /// Candidates are `{stem}.{lang}.{ext}` for each format in
    /// [`SubtitleFormat::PRIORITY`]; the first existing file wins. A
    /// manifest recorded without a language disables the lookup.
    pub fn find_subtitle(&self) -> tf_core::Result<Option<SubtitleTrack>> {
        let source = self.resolve_source()?;
        let language = match self.manifest {
            Some(ref m) => match m.subtitle_language.as_deref() {
                Some(lang) => lang,
                None => return Ok(None),
            },
            None => self.subtitle_language.as_str(),
        };

        let base = source.path.with_extension("");
        let base_name = base.file_name().map(|n| n.to_os_string()).unwrap_or_default();

        for format in SubtitleFormat::PRIORITY {
            let mut name = base_name.clone();
            name.push(format!(".{language}.{}", format.extension()));
            let candidate = base.with_file_name(name);
            if candidate.is_file() {
                return Ok(Some(SubtitleTrack {
                    path: candidate,
                    format,
                }));
            }
        }

        Ok(None)
    }

    /// Destination paths for the wanted outputs.
    pub fn compute_output_paths(&self) -> tf_core::Result<OutputPaths> {
        let source = self.resolve_source()?;
        let Some(stem) = self.output_stem() else {
            return Ok(OutputPaths::default());
        };
        let output_for = |ext: &str| self.dirs.output_dir.join(format!("{stem}.{ext}"));

        Ok(OutputPaths {
            video: source
                .wants_video
                .then(|| output_for(VIDEO_OUTPUT_EXTENSION)),
            audio: source
                .wants_audio
                .then(|| output_for(AUDIO_OUTPUT_EXTENSION)),
        })
    }

    /// `true` iff every wanted output already exists as a regular file.
    ///
    /// Existence only; contents are not checked.
    pub fn is_already_satisfied(&self) -> tf_core::Result<bool> {
        let outputs = self.compute_output_paths()?;
        Ok([outputs.video, outputs.audio]
            .iter()
            .flatten()
            .all(|p| p.is_file()))
    }

    /// Append this plan's inputs and outputs to the shared argument lists.
    ///
    /// The source always takes input slot `next_input_index`. Outputs are
    /// skipped individually when they already exist and the plan skips
    /// existing outputs. The video output maps every source stream, adds the
    /// subtitle sidecar as the next input slot when one matches, and
    /// stream-copies audio/video when remuxing. The audio output maps only
    /// the source's audio and is always re-encoded.
    ///
    /// Returns the next free input index.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the source vanished, [`Error::Pipeline`] if
    /// an output path exists but is not a regular file.
    pub fn contribute_to_command(
        &self,
        inputs: &mut Vec<String>,
        outputs: &mut Vec<String>,
        mut next_input_index: usize,
    ) -> tf_core::Result<usize> {
        let source = self.resolve_source()?;
        let paths = self.compute_output_paths()?;

        let source_index = next_input_index;
        next_input_index += 1;
        inputs.extend(["-i".to_string(), path_arg(&source.path)]);

        if let Some(video_out) = paths.video {
            if self.should_emit(&video_out)? {
                outputs.extend(["-map".to_string(), source_index.to_string()]);

                if let Some(subtitle) = self.find_subtitle()? {
                    let subtitle_index = next_input_index;
                    next_input_index += 1;
                    inputs.extend([
                        "-f".to_string(),
                        subtitle.format.demuxer().to_string(),
                        "-i".to_string(),
                        path_arg(&subtitle.path),
                    ]);
                    outputs.extend([
                        "-map".to_string(),
                        format!("{subtitle_index}:s"),
                        "-c:s".to_string(),
                        SUBTITLE_CODEC.to_string(),
                    ]);
                }

                if self.remux_only {
                    outputs.extend(["-c:v", "copy", "-c:a", "copy"].map(String::from));
                }
                outputs.push(path_arg(&video_out));
            } else {
                tracing::debug!(output = %video_out.display(), "Video output exists; skipping");
            }
        }

        if let Some(audio_out) = paths.audio {
            if self.should_emit(&audio_out)? {
                // The mp3 container cannot take arbitrary source codecs, so
                // audio is always re-encoded.
                outputs.extend(["-map".to_string(), format!("{source_index}:a")]);
                outputs.push(path_arg(&audio_out));
            } else {
                tracing::debug!(output = %audio_out.display(), "Audio output exists; skipping");
            }
        }

        Ok(next_input_index)
    }

    fn should_emit(&self, output: &Path) -> tf_core::Result<bool> {
        if output.exists() && !output.is_file() {
            return Err(Error::pipeline(
                "plan",
                format!("output path exists but is not a regular file: {}", output.display()),
            ));
        }
        Ok(!self.skip_if_output_exists || !output.exists())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
