//! Sprites: immutable BGRA images with straight alpha
//!
//! Decoding image files is left to the caller. These constructors only
//! convert already-decoded pixel buffers into our byte layout.

use crate::error::{Error, Result};

/// A read-only image used as blit source.
///
/// Pixels are stored row-major, 4 bytes each: blue, green, red, alpha.
/// Alpha is straight (not premultiplied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

fn check_len(width: u32, height: u32, actual: usize) -> Result<()> {
    let expected = width as usize * height as usize * 4;
    if actual != expected {
        return Err(Error::InvalidBuffer { expected, actual });
    }
    Ok(())
}

impl Sprite {
    /// Wrap a buffer already in BGRA straight-alpha order.
    pub fn from_bgra(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        check_len(width, height, pixels.len())?;
        Ok(Sprite {
            width,
            height,
            pixels,
        })
    }

    /// Convert straight-alpha RGBA (the usual decoder output).
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self> {
        check_len(width, height, rgba.len())?;
        let pixels = rgba
            .chunks_exact(4)
            .flat_map(|p| [p[2], p[1], p[0], p[3]])
            .collect();
        Ok(Sprite {
            width,
            height,
            pixels,
        })
    }

    /// Convert premultiplied RGBA, recovering straight color channels.
    ///
    /// Each channel becomes `min(255, (c * 255 + a / 2) / a)`; fully
    /// transparent pixels become all zero.
    pub fn from_premultiplied_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self> {
        check_len(width, height, rgba.len())?;
        let pixels = rgba
            .chunks_exact(4)
            .flat_map(|p| {
                let a = p[3];
                if a == 0 {
                    return [0, 0, 0, 0];
                }
                let unpremultiply = |c: u8| {
                    ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8
                };
                [unpremultiply(p[2]), unpremultiply(p[1]), unpremultiply(p[0]), a]
            })
            .collect();
        Ok(Sprite {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw BGRA bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// BGRA bytes of the pixel at (x, y). Callers check bounds.
    pub(crate) fn pixel_at(&self, x: u32, y: u32) -> &[u8] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        &self.pixels[offset..offset + 4]
    }
}
