//! Fixed-duration frame sequencing with fade transitions.
//!
//! A [`Timeline`] concatenates [`Frame`]s in input order into one
//! continuous visual track. Fades happen inside each frame's own duration
//! window (a gain ramp toward black), so the nominal track duration is
//! always the plain sum of frame durations.

use crate::{
    compositor::{PixelBuffer, mul_div255},
    error::{ZipreelError, ZipreelResult},
};

/// One visual unit of the output: a canvas held for a fixed duration,
/// with fade flags decided by the caller or the assembly policy.
#[derive(Clone, Debug)]
pub struct Frame {
    pub buffer: PixelBuffer,
    pub duration_sec: f64,
    pub fade_in: bool,
    pub fade_out: bool,
}

impl Frame {
    /// A frame with no fades; [`Timeline::assemble`] applies the
    /// positional policy where one is wanted.
    pub fn new(buffer: PixelBuffer, duration_sec: f64) -> Self {
        Self {
            buffer,
            duration_sec,
            fade_in: false,
            fade_out: false,
        }
    }
}

#[derive(Debug)]
pub struct Timeline {
    frames: Vec<Frame>,
    transition_sec: f64,
}

impl Timeline {
    /// Build a timeline applying the positional fade policy: the first
    /// frame fades in, the last fades out, interior frames do both. A
    /// sole frame is first and last at once and gets both.
    pub fn assemble(mut frames: Vec<Frame>, transition_sec: f64) -> ZipreelResult<Self> {
        let last = frames.len().saturating_sub(1);
        for (i, frame) in frames.iter_mut().enumerate() {
            frame.fade_in = i == 0 || i != last;
            frame.fade_out = i == last || i != 0;
        }
        Self::from_frames(frames, transition_sec)
    }

    /// Build a timeline from frames whose fade flags are already decided.
    pub fn from_frames(frames: Vec<Frame>, transition_sec: f64) -> ZipreelResult<Self> {
        if frames.is_empty() {
            return Err(ZipreelError::EmptyTimeline);
        }
        if !transition_sec.is_finite() || transition_sec < 0.0 {
            return Err(ZipreelError::validation(
                "transition duration must be finite and >= 0",
            ));
        }
        for frame in &frames {
            if !frame.duration_sec.is_finite() || frame.duration_sec <= 0.0 {
                return Err(ZipreelError::validation("frame duration must be > 0"));
            }
        }
        Ok(Self {
            frames,
            transition_sec,
        })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Nominal duration: the sum of frame durations.
    pub fn duration_sec(&self) -> f64 {
        self.frames.iter().map(|f| f.duration_sec).sum()
    }

    /// Number of output video frames rendered at `fps`.
    pub fn frame_count(&self, fps: u32) -> u64 {
        self.frames
            .iter()
            .map(|f| slide_frame_count(f.duration_sec, fps))
            .sum()
    }

    /// Render the track in input order at `fps`, feeding each output
    /// frame to `sink`. Returns the number of frames emitted.
    pub fn render(
        &self,
        fps: u32,
        mut sink: impl FnMut(&PixelBuffer) -> ZipreelResult<()>,
    ) -> ZipreelResult<u64> {
        if fps == 0 {
            return Err(ZipreelError::validation("fps must be > 0"));
        }

        let mut emitted = 0u64;
        for frame in &self.frames {
            let count = slide_frame_count(frame.duration_sec, fps);
            let mut scratch = frame.buffer.clone();
            for k in 0..count {
                let local_t = k as f64 / fps as f64;
                let gain = fade_gain(frame, local_t, self.transition_sec);
                scale_rgb(&mut scratch.data, &frame.buffer.data, gain);
                sink(&scratch)?;
                emitted += 1;
            }
        }
        Ok(emitted)
    }
}

fn slide_frame_count(duration_sec: f64, fps: u32) -> u64 {
    ((duration_sec * fps as f64).round() as u64).max(1)
}

/// Fade gain for a point inside a frame's duration window. Fade-in ramps
/// 0→1 over the transition from the frame start; fade-out ramps 1→0 into
/// the frame end; both multiply when both flags are set.
fn fade_gain(frame: &Frame, local_t: f64, transition_sec: f64) -> f32 {
    let mut gain = 1.0f64;
    if transition_sec > 0.0 {
        if frame.fade_in {
            gain *= (local_t / transition_sec).clamp(0.0, 1.0);
        }
        if frame.fade_out {
            let remaining = (frame.duration_sec - local_t).max(0.0);
            gain *= (remaining / transition_sec).clamp(0.0, 1.0);
        }
    }
    gain as f32
}

/// Scale RGB toward black by `gain`, leaving alpha opaque.
fn scale_rgb(dst: &mut [u8], src: &[u8], gain: f32) {
    if gain >= 1.0 {
        dst.copy_from_slice(src);
        return;
    }
    let g = ((gain.max(0.0) * 255.0).round() as u32).min(255) as u16;
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        d[0] = mul_div255(s[0] as u16, g) as u8;
        d[1] = mul_div255(s[1] as u16, g) as u8;
        d[2] = mul_div255(s[2] as u16, g) as u8;
        d[3] = 255;
    }
}
