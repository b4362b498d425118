//! Software framebuffer
//!
//! A [`Framebuffer`] is a row-major BGRX pixel buffer that can be pushed to a
//! window with [`Connection::put_framebuffer`](crate::Connection::put_framebuffer).
//! All drawing is clipped per pixel: coordinates outside the buffer are
//! silently ignored, so callers never have to clip shapes themselves.

mod blit;
mod color;
mod sprite;

pub use color::{colors, Rgb};
pub use sprite::Sprite;

use crate::error::{Error, Result};

/// Owned pixel buffer, 4 bytes per pixel: blue, green, red, unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Framebuffer {
    /// A black buffer of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Framebuffer {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Take over an existing BGRX buffer.
    pub fn from_bytes(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(Error::InvalidBuffer {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Framebuffer {
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

    /// The raw bytes, ready for a ZPixmap PutImage
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Byte offset of (x, y), or `None` when outside the buffer
    #[inline]
    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }

    #[inline]
    fn plot(&mut self, x: i64, y: i64, color: Rgb) {
        if let Some(offset) = self.offset(x, y) {
            self.pixels[offset] = color.b;
            self.pixels[offset + 1] = color.g;
            self.pixels[offset + 2] = color.r;
        }
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        self.plot(x as i64, y as i64, color);
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        self.offset(x as i64, y as i64).map(|offset| Rgb {
            b: self.pixels[offset],
            g: self.pixels[offset + 1],
            r: self.pixels[offset + 2],
        })
    }

    /// Fill the whole buffer with one color.
    pub fn clear(&mut self, color: Rgb) {
        for px in self.pixels.chunks_exact_mut(4) {
            px[0] = color.b;
            px[1] = color.g;
            px[2] = color.r;
        }
    }

    /// True when the box `[x0, x1] x [y0, y1]` misses the buffer entirely.
    fn misses(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> bool {
        x1 < 0 || y1 < 0 || x0 >= self.width as i64 || y0 >= self.height as i64
    }

    /// Bresenham line from (x0, y0) to (x1, y1), both endpoints included.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        let (mut x, mut y) = (x0 as i64, y0 as i64);
        let (x1, y1) = (x1 as i64, y1 as i64);
        if self.misses(x.min(x1), y.min(y1), x.max(x1), y.max(y1)) {
            return;
        }
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.plot(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Fill the half-open span `[x0, x1) x [y0, y1)`, clipped to the buffer.
    fn fill_span(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb) {
        let x0 = x0.max(0);
        let y0 = y0.max(0);
        let x1 = x1.min(self.width as i64);
        let y1 = y1.min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let stride = self.width as usize * 4;
        for row in y0 as usize..y1 as usize {
            let start = row * stride + x0 as usize * 4;
            let end = row * stride + x1 as usize * 4;
            for px in self.pixels[start..end].chunks_exact_mut(4) {
                px[0] = color.b;
                px[1] = color.g;
                px[2] = color.r;
            }
        }
    }

    /// Filled rectangle with its top-left corner at (x, y).
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb) {
        let (x, y) = (x as i64, y as i64);
        self.fill_span(x, y, x + width as i64, y + height as i64, color);
    }

    /// Rectangle outline covering `width` x `height` pixels.
    pub fn draw_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb) {
        if width == 0 || height == 0 {
            return;
        }
        let (left, top) = (x as i64, y as i64);
        let (right, bottom) = (left + width as i64, top + height as i64);
        self.fill_span(left, top, right, top + 1, color);
        self.fill_span(left, bottom - 1, right, bottom, color);
        self.fill_span(left, top, left + 1, bottom, color);
        self.fill_span(right - 1, top, right, bottom, color);
    }

    /// Midpoint circle outline. A radius of 0 draws the center pixel.
    pub fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Rgb) {
        if radius < 0 {
            return;
        }
        let (cx, cy, r) = (cx as i64, cy as i64, radius as i64);
        if self.misses(cx - r, cy - r, cx + r, cy + r) {
            return;
        }
        let mut x = 0i64;
        let mut y = r;
        let mut d = 3 - 2 * r;

        while y >= x {
            for (px, py) in [
                (x, y),
                (-x, y),
                (x, -y),
                (-x, -y),
                (y, x),
                (-y, x),
                (y, -x),
                (-y, -x),
            ] {
                self.plot(cx + px, cy + py, color);
            }
            if d > 0 {
                y -= 1;
                d += 4 * (x - y) + 10;
            } else {
                d += 4 * x + 6;
            }
            x += 1;
        }
    }

    /// Filled disc: every pixel with `dx*dx + dy*dy <= r*r`.
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Rgb) {
        if radius < 0 {
            return;
        }
        let (cx, cy, r) = (cx as i64, cy as i64, radius as i64);
        let r2 = r * r;
        // Only walk the part of the bounding box that lies inside the buffer
        let dy_range = (-r).max(-cy)..=r.min(self.height as i64 - 1 - cy);
        let dx_min = (-r).max(-cx);
        let dx_max = r.min(self.width as i64 - 1 - cx);
        for dy in dy_range {
            for dx in dx_min..=dx_max {
                if dx * dx + dy * dy <= r2 {
                    self.plot(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Triangle outline through three vertices.
    pub fn draw_triangle(&mut self, p0: (i32, i32), p1: (i32, i32), p2: (i32, i32), color: Rgb) {
        self.draw_line(p0.0, p0.1, p1.0, p1.1, color);
        self.draw_line(p1.0, p1.1, p2.0, p2.1, color);
        self.draw_line(p2.0, p2.1, p0.0, p0.1, color);
    }
}
