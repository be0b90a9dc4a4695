//! Orchestration: extract an archive, pick a composition strategy, and
//! encode the result.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::{info, warn};

use crate::{
    archive::ArchiveReader,
    audio::{self, MIX_CHANNELS, MIX_SAMPLE_RATE},
    classify::{CategorizedFiles, classify},
    compositor::compose_image_frame,
    encode::{AudioInput, FfmpegEncoder, default_mp4_config},
    error::{ZipreelError, ZipreelResult},
    text::TextRenderer,
    timeline::{Frame, Timeline},
};

/// Fixed output and pacing parameters of a composition.
#[derive(Clone, Debug)]
pub struct ComposerSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub seconds_per_image: f64,
    pub transition_sec: f64,
    pub text_duration_sec: f64,
    pub background_rgba: [u8; 4],
    pub text_rgba: [u8; 4],
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            seconds_per_image: 3.0,
            transition_sec: 0.5,
            text_duration_sec: 5.0,
            background_rgba: [0, 0, 0, 255],
            text_rgba: [255, 255, 255, 255],
        }
    }
}

/// Terminal descriptor of a finished composition.
#[derive(Clone, Debug, serde::Serialize)]
pub struct CompositionResult {
    pub output_path: PathBuf,
    pub byte_size: u64,
    pub source_entry_count: usize,
}

/// The composition path chosen from the classified content; decided once
/// per composition.
#[derive(Debug)]
enum Strategy {
    Slideshow {
        images: Vec<PathBuf>,
        audio: Option<PathBuf>,
    },
    TextOverlay {
        text: String,
    },
}

pub struct Composer {
    output_dir: PathBuf,
    settings: ComposerSettings,
}

impl Composer {
    /// Create a composer writing into `output_dir` (created if missing).
    pub fn new(output_dir: impl Into<PathBuf>) -> ZipreelResult<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!("failed to create output directory '{}'", output_dir.display())
        })?;
        Ok(Self {
            output_dir,
            settings: ComposerSettings::default(),
        })
    }

    pub fn with_settings(mut self, settings: ComposerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ComposerSettings {
        &self.settings
    }

    /// Extract `archive_path`, choose a strategy from the classified
    /// content (images → slideshow, else document text → text overlay),
    /// and encode the result as `output_name` in the output directory.
    ///
    /// Scratch extraction directories are removed when the reader goes
    /// out of scope, on success and failure alike.
    pub fn compose_from_archive(
        &self,
        archive_path: &Path,
        output_name: &str,
    ) -> ZipreelResult<CompositionResult> {
        info!("processing archive '{}'", archive_path.display());

        let mut reader = ArchiveReader::new();
        let source_entry_count = reader.list_entries(archive_path)?.len();

        let extracted = reader.extract_all(archive_path)?;
        let files = classify(&extracted);
        let strategy = self.select_strategy(&files)?;

        let output_path = self.output_dir.join(output_name);
        match strategy {
            Strategy::Slideshow { images, audio } => {
                self.render_slideshow(&images, audio.as_deref(), &output_path)?;
            }
            Strategy::TextOverlay { text } => {
                self.render_text_overlay(&text, &output_path)?;
            }
        }

        let byte_size = std::fs::metadata(&output_path)
            .with_context(|| format!("failed to stat output '{}'", output_path.display()))?
            .len();
        info!(
            "video saved to '{}' ({byte_size} bytes)",
            output_path.display()
        );

        Ok(CompositionResult {
            output_path,
            byte_size,
            source_entry_count,
        })
    }

    /// Strict priority: any images → slideshow; else non-empty document
    /// text → text overlay; else there is nothing to compose.
    fn select_strategy(&self, files: &CategorizedFiles) -> ZipreelResult<Strategy> {
        if !files.images.is_empty() {
            info!("creating slideshow video from {} images", files.images.len());
            return Ok(Strategy::Slideshow {
                images: files.images.clone(),
                audio: files.audio.first().cloned(),
            });
        }

        let text = gather_document_text(&files.documents);
        if !text.trim().is_empty() {
            info!(
                "creating text overlay video from {} documents",
                files.documents.len()
            );
            return Ok(Strategy::TextOverlay { text });
        }

        Err(ZipreelError::NoSuitableContent)
    }

    fn render_slideshow(
        &self,
        images: &[PathBuf],
        audio_path: Option<&Path>,
        output_path: &Path,
    ) -> ZipreelResult<()> {
        let s = &self.settings;

        let mut frames = Vec::with_capacity(images.len());
        for image_path in images {
            match compose_image_frame(image_path, s.width, s.height, s.background_rgba) {
                Ok(buffer) => frames.push(Frame::new(buffer, s.seconds_per_image)),
                // One bad image never aborts the slideshow.
                Err(e) => warn!("skipping image '{}': {e}", image_path.display()),
            }
        }

        let timeline = Timeline::assemble(frames, s.transition_sec)?;

        let prepared_audio = audio_path.and_then(|path| {
            match self.prepare_audio(path, &timeline) {
                Ok(prepared) => Some(prepared),
                Err(e) => {
                    warn!("proceeding without audio: {e}");
                    None
                }
            }
        });

        self.encode_timeline(
            &timeline,
            prepared_audio.as_ref().map(|a| &a.input),
            output_path,
        )
    }

    fn render_text_overlay(&self, text: &str, output_path: &Path) -> ZipreelResult<()> {
        let s = &self.settings;
        let mut renderer = TextRenderer::new();
        let frame = renderer.render(
            text,
            s.width,
            s.height,
            s.background_rgba,
            s.text_rgba,
            s.text_duration_sec,
        )?;
        // A text video is a single static frame with no fades.
        let timeline = Timeline::from_frames(vec![frame], s.transition_sec)?;
        self.encode_timeline(&timeline, None, output_path)
    }

    /// Decode the audio source and reconcile it against the timeline:
    /// loop from the start to cover the track, or trim, so the PCM length
    /// matches the rendered frame count exactly.
    fn prepare_audio(&self, path: &Path, timeline: &Timeline) -> ZipreelResult<PreparedAudio> {
        let info = audio::probe_audio(path)?;
        let track = audio::decode_audio(path, MIX_SAMPLE_RATE)?;
        if track.interleaved_f32.is_empty() {
            return Err(ZipreelError::audio(format!(
                "'{}' contains no audio samples",
                path.display()
            )));
        }

        let video_frames = timeline.frame_count(self.settings.fps);
        let target_frames =
            audio::video_frames_to_samples(video_frames, self.settings.fps, MIX_SAMPLE_RATE);
        let samples = audio::reconcile(&track, target_frames);

        let pcm_file = tempfile::Builder::new()
            .prefix("zipreel-audio-")
            .suffix(".f32le")
            .tempfile()
            .map_err(|e| ZipreelError::audio(format!("failed to create pcm scratch file: {e}")))?;
        audio::write_f32le(&samples, pcm_file.path())?;

        info!(
            "attaching audio '{}' ({:.1}s source, reconciled to {:.1}s)",
            path.display(),
            info.duration_sec,
            target_frames as f64 / f64::from(MIX_SAMPLE_RATE)
        );

        Ok(PreparedAudio {
            input: AudioInput {
                path: pcm_file.path().to_path_buf(),
                sample_rate: MIX_SAMPLE_RATE,
                channels: MIX_CHANNELS,
            },
            _pcm_file: pcm_file,
        })
    }

    fn encode_timeline(
        &self,
        timeline: &Timeline,
        audio: Option<&AudioInput>,
        output_path: &Path,
    ) -> ZipreelResult<()> {
        let s = &self.settings;
        let cfg = default_mp4_config(output_path, s.width, s.height, s.fps);
        let mut encoder = FfmpegEncoder::new(cfg, audio)?;
        timeline.render(s.fps, |buffer| encoder.encode_frame(buffer))?;
        encoder.finish()
    }
}

/// Reconciled PCM handed to the encoder; the scratch file lives exactly
/// as long as this value.
struct PreparedAudio {
    input: AudioInput,
    _pcm_file: tempfile::NamedTempFile,
}

fn gather_document_text(documents: &[PathBuf]) -> String {
    let mut text = String::new();
    for doc in documents {
        match std::fs::read_to_string(doc) {
            Ok(content) => {
                text.push_str(&content);
                text.push_str("\n\n");
            }
            // Binary documents (pdf, doc) fail the UTF-8 read and are
            // skipped; they contribute no overlay text.
            Err(e) => warn!("skipping unreadable document '{}': {e}", doc.display()),
        }
    }
    text
}
