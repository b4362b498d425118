//! Sprite compositing onto a [`Framebuffer`]

use super::{Framebuffer, Sprite};

/// Blend one straight-alpha channel over an opaque destination.
#[inline]
fn blend(src: u8, dst: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    let out = (src as u32 * a + dst as u32 * (255 - a) + 255) / 255;
    out.min(255) as u8
}

/// Source-over for one BGRA pixel onto one BGRX pixel.
#[inline]
fn composite(src: &[u8], dst: &mut [u8]) {
    match src[3] {
        0 => {}
        255 => dst[..3].copy_from_slice(&src[..3]),
        alpha => {
            for c in 0..3 {
                dst[c] = blend(src[c], dst[c], alpha);
            }
        }
    }
}

impl Framebuffer {
    /// Composite the whole sprite with its top-left corner at (dx, dy).
    pub fn blit(&mut self, sprite: &Sprite, dx: i32, dy: i32) {
        self.blit_region(sprite, 0, 0, sprite.width(), sprite.height(), dx, dy);
    }

    /// Composite the `sw` x `sh` region of `sprite` starting at (sx, sy),
    /// placing that region's top-left corner at (dx, dy).
    ///
    /// The region is clamped to the sprite, then the destination is clipped to
    /// the framebuffer. Nothing outside the intersection is touched.
    #[allow(clippy::too_many_arguments)]
    pub fn blit_region(
        &mut self,
        sprite: &Sprite,
        sx: u32,
        sy: u32,
        sw: u32,
        sh: u32,
        dx: i32,
        dy: i32,
    ) {
        let src_x1 = (sx as i64 + sw as i64).min(sprite.width() as i64);
        let src_y1 = (sy as i64 + sh as i64).min(sprite.height() as i64);
        let (sx, sy) = (sx as i64, sy as i64);
        if sx >= src_x1 || sy >= src_y1 {
            return;
        }

        // Destination rectangle of the clamped region, then clip to the buffer
        let (dx, dy) = (dx as i64, dy as i64);
        let x0 = dx.max(0);
        let y0 = dy.max(0);
        let x1 = (dx + (src_x1 - sx)).min(self.width as i64);
        let y1 = (dy + (src_y1 - sy)).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let stride = self.width as usize * 4;
        for y in y0..y1 {
            let src_y = (sy + (y - dy)) as u32;
            let row = y as usize * stride;
            for x in x0..x1 {
                let src_x = (sx + (x - dx)) as u32;
                let offset = row + x as usize * 4;
                composite(sprite.pixel_at(src_x, src_y), &mut self.pixels[offset..offset + 4]);
            }
        }
    }
}
