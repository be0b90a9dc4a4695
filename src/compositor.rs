//! Single-image frame composition: decode, shrink-to-fit, letterbox.

use std::path::Path;

use image::{DynamicImage, imageops::FilterType};

use crate::error::{ZipreelError, ZipreelResult};

/// Opaque straight-alpha RGBA8 buffer, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a buffer filled with a solid color. The alpha channel is
    /// forced opaque; composed frames never carry transparency.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let fill = [rgba[0], rgba[1], rgba[2], 255];
        let mut data = vec![0u8; width as usize * height as usize * 4];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&fill);
        }
        Self {
            width,
            height,
            data,
        }
    }
}

/// Compose one image onto a fixed-size canvas: aspect-preserving
/// shrink-to-fit (never upscale) and centered placement over a solid
/// background. The output is always exactly `canvas_width` ×
/// `canvas_height`.
pub fn compose_image_frame(
    path: &Path,
    canvas_width: u32,
    canvas_height: u32,
    background_rgba: [u8; 4],
) -> ZipreelResult<PixelBuffer> {
    if canvas_width == 0 || canvas_height == 0 {
        return Err(ZipreelError::validation("canvas width/height must be > 0"));
    }

    let img = image::open(path).map_err(|e| ZipreelError::UnsupportedImage {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let resized = shrink_to_fit(img, canvas_width, canvas_height).to_rgba8();

    let mut canvas = PixelBuffer::filled(canvas_width, canvas_height, background_rgba);
    paste_centered(&mut canvas, &resized, background_rgba);
    Ok(canvas)
}

/// Downscale so the image fits entirely within the bounds, preserving
/// aspect ratio. Images already inside the bounds are left untouched.
fn shrink_to_fit(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    if img.width() <= max_width && img.height() <= max_height {
        return img;
    }
    img.resize(max_width, max_height, FilterType::Lanczos3)
}

fn paste_centered(canvas: &mut PixelBuffer, img: &image::RgbaImage, background_rgba: [u8; 4]) {
    let x0 = ((canvas.width - img.width()) / 2) as usize;
    let y0 = ((canvas.height - img.height()) / 2) as usize;
    let stride = canvas.width as usize * 4;

    for (y, row) in img.rows().enumerate() {
        let row_start = (y0 + y) * stride + x0 * 4;
        for (x, px) in row.enumerate() {
            let idx = row_start + x * 4;
            let out = flatten_over_background(px.0, background_rgba);
            canvas.data[idx..idx + 4].copy_from_slice(&out);
        }
    }
}

/// Blend a straight-alpha pixel over the opaque background color.
fn flatten_over_background(src: [u8; 4], bg: [u8; 4]) -> [u8; 4] {
    let a = src[3] as u16;
    if a == 255 {
        return [src[0], src[1], src[2], 255];
    }
    let inv = 255u16 - a;
    [
        (mul_div255(src[0] as u16, a) + mul_div255(bg[0] as u16, inv)).min(255) as u8,
        (mul_div255(src[1] as u16, a) + mul_div255(bg[1] as u16, inv)).min(255) as u8,
        (mul_div255(src[2] as u16, a) + mul_div255(bg[2] as u16, inv)).min(255) as u8,
        255,
    ]
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}
