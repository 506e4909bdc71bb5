//! Blank-border cropping applied to downloaded images.

use image::{GenericImageView, GrayImage};
use std::path::Path;
use tracing::debug;

/// Default lightness tolerance for `--crop-blank-factor`.
pub const DEFAULT_CROP_FACTOR: u8 = 100;
/// Default per-edge limit in pixels for `--crop-blank-max-size`.
pub const DEFAULT_CROP_MAX_SIZE: u32 = 30;

/// Path-in/path-out image processor. Returns true only if `output` was written.
pub trait ImagePostProcessor {
    fn process(&self, input: &Path, output: &Path) -> bool;
}

/// Trims near-white rows and columns from each edge, at most `max_size` pixels per edge.
///
/// A pixel counts as blank when its luma is at least `255 - factor`.
#[derive(Debug, Clone, Copy)]
pub struct BlankCropper {
    pub factor: u8,
    pub max_size: u32,
}

impl Default for BlankCropper {
    fn default() -> Self {
        Self {
            factor: DEFAULT_CROP_FACTOR,
            max_size: DEFAULT_CROP_MAX_SIZE,
        }
    }
}

/// Edges to remove: (left, top, right, bottom).
type Margins = (u32, u32, u32, u32);

impl BlankCropper {
    pub fn new(factor: u8, max_size: u32) -> Self {
        Self { factor, max_size }
    }

    fn threshold(&self) -> u8 {
        255 - self.factor
    }

    fn row_blank(&self, img: &GrayImage, y: u32) -> bool {
        (0..img.width()).all(|x| img.get_pixel(x, y).0[0] >= self.threshold())
    }

    fn column_blank(&self, img: &GrayImage, x: u32) -> bool {
        (0..img.height()).all(|y| img.get_pixel(x, y).0[0] >= self.threshold())
    }

    fn margins(&self, img: &GrayImage) -> Margins {
        let (w, h) = img.dimensions();
        let limit_x = self.max_size.min(w / 2);
        let limit_y = self.max_size.min(h / 2);
        let top = (0..limit_y).take_while(|&y| self.row_blank(img, y)).count() as u32;
        let bottom = (0..limit_y)
            .take_while(|&i| self.row_blank(img, h - 1 - i))
            .count() as u32;
        let left = (0..limit_x).take_while(|&x| self.column_blank(img, x)).count() as u32;
        let right = (0..limit_x)
            .take_while(|&i| self.column_blank(img, w - 1 - i))
            .count() as u32;
        (left, top, right, bottom)
    }
}

impl ImagePostProcessor for BlankCropper {
    fn process(&self, input: &Path, output: &Path) -> bool {
        let img = match image::open(input) {
            Ok(img) => img,
            Err(e) => {
                debug!(path = %input.display(), error = %e, "cannot decode image for cropping");
                return false;
            }
        };
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return false;
        }
        let (left, top, right, bottom) = self.margins(&img.to_luma8());
        if left + top + right + bottom == 0 {
            return false;
        }
        let cropped = img.crop_imm(left, top, w - left - right, h - top - bottom);
        match cropped.save(output) {
            Ok(()) => true,
            Err(e) => {
                debug!(path = %output.display(), error = %e, "cannot write cropped image");
                false
            }
        }
    }
}
