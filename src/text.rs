//! Static text frame rendering: greedy word wrap into centered lines,
//! rasterized with cosmic-text.

use cosmic_text::{Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache, Weight};
use tracing::warn;

use crate::{
    compositor::{PixelBuffer, mul_div255},
    error::{ZipreelError, ZipreelResult},
    timeline::Frame,
};

const FONT_SIZE_PX: f32 = 60.0;
const LINE_HEIGHT_PX: i32 = 80;
const SIDE_MARGIN_PX: u32 = 50;

fn text_attrs() -> Attrs<'static> {
    Attrs::new().family(Family::SansSerif).weight(Weight::BOLD)
}

/// Rasterizes text frames. Owns the font database and glyph cache, which
/// are expensive to build, so one renderer is reused per composition.
pub struct TextRenderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl TextRenderer {
    pub fn new() -> Self {
        let font_system = FontSystem::new();
        if font_system.db().faces().next().is_none() {
            // Keep composing: the frame degrades to background only.
            warn!("no fonts available on this system; text will not be visible");
        }
        Self {
            font_system,
            swash_cache: SwashCache::new(),
        }
    }

    /// Render one static frame: word-wrapped lines, each horizontally
    /// centered, the block vertically centered. Text that overflows the
    /// canvas keeps its computed (negative) start and is clipped per
    /// pixel at the buffer edges. Never fails for want of fonts.
    pub fn render(
        &mut self,
        text: &str,
        canvas_width: u32,
        canvas_height: u32,
        background_rgba: [u8; 4],
        text_rgba: [u8; 4],
        duration_sec: f64,
    ) -> ZipreelResult<Frame> {
        if canvas_width == 0 || canvas_height == 0 {
            return Err(ZipreelError::validation("canvas width/height must be > 0"));
        }

        let limit = canvas_width.saturating_sub(2 * SIDE_MARGIN_PX) as f32;
        let lines = wrap_words(text, limit, |s| measure_width(&mut self.font_system, s));

        let mut canvas = PixelBuffer::filled(canvas_width, canvas_height, background_rgba);

        let total_height = lines.len() as i32 * LINE_HEIGHT_PX;
        let start_y = (canvas_height as i32 - total_height) / 2;

        for (i, line) in lines.iter().enumerate() {
            let line_width = measure_width(&mut self.font_system, line);
            let x = ((canvas_width as f32 - line_width) / 2.0).floor() as i32;
            let y = start_y + i as i32 * LINE_HEIGHT_PX;
            self.draw_line(&mut canvas, line, x, y, text_rgba);
        }

        Ok(Frame::new(canvas, duration_sec))
    }

    fn draw_line(&mut self, canvas: &mut PixelBuffer, line: &str, x: i32, y: i32, rgba: [u8; 4]) {
        let metrics = Metrics::new(FONT_SIZE_PX, LINE_HEIGHT_PX as f32);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_size(&mut self.font_system, None, None);
        buffer.set_text(&mut self.font_system, line, &text_attrs(), Shaping::Advanced, None);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let color = Color::rgba(rgba[0], rgba[1], rgba[2], rgba[3]);
        let (width, height) = (canvas.width as i32, canvas.height as i32);
        let stride = canvas.width as usize * 4;
        let data = &mut canvas.data;

        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            color,
            |gx, gy, gw, gh, c| {
                for dy in 0..gh as i32 {
                    for dx in 0..gw as i32 {
                        let px = x + gx + dx;
                        let py = y + gy + dy;
                        if px < 0 || py < 0 || px >= width || py >= height {
                            continue;
                        }
                        let idx = py as usize * stride + px as usize * 4;
                        blend_px(&mut data[idx..idx + 4], c);
                    }
                }
            },
        );
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Blend a straight-alpha source color over one opaque canvas pixel.
fn blend_px(dst: &mut [u8], c: Color) {
    let a = c.a() as u16;
    if a == 0 {
        return;
    }
    let inv = 255u16 - a;
    dst[0] = (mul_div255(c.r() as u16, a) + mul_div255(dst[0] as u16, inv)).min(255) as u8;
    dst[1] = (mul_div255(c.g() as u16, a) + mul_div255(dst[1] as u16, inv)).min(255) as u8;
    dst[2] = (mul_div255(c.b() as u16, a) + mul_div255(dst[2] as u16, inv)).min(255) as u8;
    dst[3] = 255;
}

/// Measure the rendered width of a single line of text.
fn measure_width(font_system: &mut FontSystem, text: &str) -> f32 {
    let metrics = Metrics::new(FONT_SIZE_PX, LINE_HEIGHT_PX as f32);
    let mut buffer = Buffer::new(font_system, metrics);
    buffer.set_size(font_system, None, None);
    buffer.set_text(font_system, text, &text_attrs(), Shaping::Advanced, None);
    buffer.shape_until_scroll(font_system, false);

    let mut max_x = 0.0f32;
    for run in buffer.layout_runs() {
        for glyph in run.glyphs.iter() {
            max_x = max_x.max(glyph.x + glyph.w);
        }
    }
    max_x
}

/// Greedy word wrap: append words while the measured line stays within
/// `limit`; a word that would overflow closes the line and opens the
/// next. A single word wider than `limit` gets its own line, never
/// split mid-word.
fn wrap_words(text: &str, limit: f32, mut measure: impl FnMut(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current.join(" "), word)
        };

        if measure(&candidate) <= limit {
            current.push(word);
        } else if current.is_empty() {
            lines.push(word.to_string());
        } else {
            lines.push(current.join(" "));
            current = vec![word];
        }
    }
    if !current.is_empty() {
        lines.push(current.join(" "));
    }
    lines
}
