//! Audio probing, decoding and duration reconciliation.
//!
//! Decoding shells out to the system `ffmpeg` for f32le PCM at a fixed
//! mix rate; reconciliation loops or trims the PCM so its sample count
//! matches the rendered video exactly.

use std::path::Path;

use crate::error::{ZipreelError, ZipreelResult};

pub const MIX_SAMPLE_RATE: u32 = 48_000;
pub const MIX_CHANNELS: u16 = 2;

/// Interleaved f32 PCM plus its format.
#[derive(Clone, Debug)]
pub struct AudioTrack {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioTrack {
    /// Number of sample frames (one frame = one sample per channel).
    pub fn sample_frames(&self) -> u64 {
        (self.interleaved_f32.len() / usize::from(self.channels.max(1))) as u64
    }

    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_frames() as f64 / f64::from(self.sample_rate)
    }
}

/// What `ffprobe` reports about an audio source.
#[derive(Clone, Debug)]
pub struct AudioSourceInfo {
    pub duration_sec: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Probe an audio file with `ffprobe`. Fails with an attach error when
/// the tool fails or the file has no audio stream; callers recover by
/// composing without audio.
pub fn probe_audio(path: &Path) -> ZipreelResult<AudioSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        sample_rate: Option<String>,
        channels: Option<u16>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| ZipreelError::audio(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ZipreelError::audio(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ZipreelError::audio(format!("ffprobe json parse failed: {e}")))?;
    let audio_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .ok_or_else(|| {
            ZipreelError::audio(format!("no audio stream in '{}'", path.display()))
        })?;

    let sample_rate = audio_stream
        .sample_rate
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(MIX_SAMPLE_RATE);
    let channels = audio_stream.channels.unwrap_or(MIX_CHANNELS);
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(AudioSourceInfo {
        duration_sec,
        sample_rate,
        channels,
    })
}

/// Decode an audio file to interleaved stereo f32 PCM at `sample_rate`
/// using the system `ffmpeg`.
pub fn decode_audio(path: &Path, sample_rate: u32) -> ZipreelResult<AudioTrack> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ZipreelError::audio(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        return Err(ZipreelError::audio(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(ZipreelError::audio(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioTrack {
        sample_rate,
        channels: MIX_CHANNELS,
        interleaved_f32: pcm,
    })
}

/// Convert a rendered video frame count to the matching sample-frame
/// count at `sample_rate`, rounding to the nearest sample.
pub fn video_frames_to_samples(video_frames: u64, fps: u32, sample_rate: u32) -> u64 {
    if fps == 0 {
        return 0;
    }
    let num = u128::from(video_frames) * u128::from(sample_rate);
    let den = u128::from(fps);
    ((num + den / 2) / den) as u64
}

/// Reconcile a track against a target length: loop from the start until
/// the target is covered, truncating exactly; a longer source is simply
/// trimmed. Returns interleaved PCM with exactly `target_frames` sample
/// frames (silence if the source is empty).
pub fn reconcile(track: &AudioTrack, target_frames: u64) -> Vec<f32> {
    let channels = usize::from(track.channels.max(1));
    let src = &track.interleaved_f32;
    let src_frames = src.len() / channels;
    let target = target_frames as usize;

    if src_frames == 0 {
        return vec![0.0; target * channels];
    }

    let mut out = Vec::with_capacity(target * channels);
    let mut remaining = target;
    while remaining > 0 {
        let take = remaining.min(src_frames);
        out.extend_from_slice(&src[..take * channels]);
        remaining -= take;
    }
    out
}

/// Write interleaved f32 PCM to a raw little-endian `.f32le` file.
pub fn write_f32le(samples: &[f32], out_path: &Path) -> ZipreelResult<()> {
    let mut bytes = Vec::<u8>::with_capacity(samples.len() * 4);
    for &sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ZipreelError::audio(format!(
            "failed to write pcm file '{}': {e}",
            out_path.display()
        ))
    })
}
