//! Compose a single MP4 from a zip archive of mixed media: an image
//! slideshow with optional background audio, or a text-overlay video
//! rendered from document content. Encoding goes through the system
//! `ffmpeg` binary; see [`composer::Composer`] for the entry point.

#![forbid(unsafe_code)]

pub mod archive;
pub mod audio;
pub mod classify;
pub mod composer;
pub mod compositor;
pub mod encode;
pub mod error;
pub mod text;
pub mod timeline;

pub use archive::{ArchiveEntry, ArchiveReader, EntryTimestamp};
pub use classify::{CategorizedFiles, Category, classify};
pub use composer::{Composer, ComposerSettings, CompositionResult};
pub use compositor::{PixelBuffer, compose_image_frame};
pub use encode::{AudioInput, EncodeConfig, FfmpegEncoder, default_mp4_config, is_ffmpeg_on_path};
pub use error::{ZipreelError, ZipreelResult};
pub use text::TextRenderer;
pub use timeline::{Frame, Timeline};
