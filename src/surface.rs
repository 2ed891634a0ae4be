use crate::color::to_rgba8;
use crate::error::{MapError, Result};
use macroquad::color::{Color, BLACK};
use macroquad::texture::Image;

/// A mutable pixel buffer the renderer can draw onto.
pub trait Surface {
    /// Size in pixels as `(width, height)`.
    fn size(&self) -> (u32, u32);

    /// Fills every pixel with `color`, ignoring what was there.
    fn fill(&mut self, color: Color);

    /// Draws `image` with its top-left corner at `(x, y)`, clipping at the edges.
    fn blit(&mut self, image: &Image, x: u32, y: u32);
}

/// Allocates an opaque black surface of the given size.
pub fn new_surface(width: u32, height: u32) -> Result<Image> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok(Image::gen_image_color(w, h, BLACK)),
        _ => Err(MapError::SurfaceTooLarge { width, height }),
    }
}

impl Surface for Image {
    fn size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    fn fill(&mut self, color: Color) {
        let rgba = to_rgba8(color);
        for px in self.bytes.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    fn blit(&mut self, image: &Image, x: u32, y: u32) {
        let (dw, dh) = (self.width as usize, self.height as usize);
        let (sw, sh) = (image.width as usize, image.height as usize);
        let (x, y) = (x as usize, y as usize);
        if x >= dw || y >= dh {
            return;
        }
        let cols = sw.min(dw - x);
        let rows = sh.min(dh - y);

        for row in 0..rows {
            let src = &image.bytes[row * sw * 4..(row * sw + cols) * 4];
            let start = ((y + row) * dw + x) * 4;
            let dst = &mut self.bytes[start..start + cols * 4];
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                blend_over(d, s);
            }
        }
    }
}

/// Source-over compositing of one RGBA8 pixel.
#[inline]
fn blend_over(dst: &mut [u8], src: &[u8]) {
    match src[3] {
        255 => dst.copy_from_slice(src),
        0 => {}
        sa => {
            let sa = sa as u32;
            let da = dst[3] as u32;
            // out_a = sa + da * (1 - sa), all scaled by 255
            let out_a = sa * 255 + da * (255 - sa);
            if out_a == 0 {
                dst.copy_from_slice(&[0, 0, 0, 0]);
                return;
            }
            for i in 0..3 {
                let c = src[i] as u32 * sa * 255 + dst[i] as u32 * da * (255 - sa);
                dst[i] = ((c + out_a / 2) / out_a) as u8;
            }
            dst[3] = ((out_a + 127) / 255) as u8;
        }
    }
}
