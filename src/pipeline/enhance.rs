//! Page image enhancement applied before recognition.
//!
//! Scans with poor contrast or bleed-through often recognise better after a
//! cheap preprocessing pass. Each strategy is a pure image transform; the
//! choice is recorded on the [`crate::ocr::PageImage`] so a batch report can
//! say what the model actually saw.

use image::{DynamicImage, GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Binarisation cut-off for [`EnhanceStrategy::Threshold`].
const THRESHOLD_LEVEL: u8 = 128;

/// Preprocessing applied to each rendered page before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum EnhanceStrategy {
    /// No transformation. (default)
    #[default]
    Original,
    /// Luma-only conversion; removes colour noise from tinted scans.
    Grayscale,
    /// Stretch the luma histogram to the full 0–255 range.
    ContrastStretch,
    /// Binarise at a fixed level; strongest option for faint text on
    /// uniform backgrounds.
    Threshold,
    /// Unsharp mask to crisp up slightly blurred scans.
    Sharpen,
}

impl EnhanceStrategy {
    /// Identifier used in reports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnhanceStrategy::Original => "original",
            EnhanceStrategy::Grayscale => "grayscale",
            EnhanceStrategy::ContrastStretch => "contrast-stretch",
            EnhanceStrategy::Threshold => "threshold",
            EnhanceStrategy::Sharpen => "sharpen",
        }
    }

    /// Apply the strategy, producing a new image.
    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        match self {
            EnhanceStrategy::Original => image,
            EnhanceStrategy::Grayscale => image.grayscale(),
            EnhanceStrategy::ContrastStretch => {
                DynamicImage::ImageLuma8(stretch_contrast(image.to_luma8()))
            }
            EnhanceStrategy::Threshold => {
                DynamicImage::ImageLuma8(binarise(image.to_luma8(), THRESHOLD_LEVEL))
            }
            EnhanceStrategy::Sharpen => image.unsharpen(1.5, 3),
        }
    }
}

/// Linear histogram stretch over the observed luma range.
fn stretch_contrast(mut img: GrayImage) -> GrayImage {
    let (mut lo, mut hi) = (u8::MAX, u8::MIN);
    for Luma([v]) in img.pixels() {
        lo = lo.min(*v);
        hi = hi.max(*v);
    }
    if lo >= hi {
        // Flat image, nothing to stretch.
        return img;
    }
    let range = (hi - lo) as f32;
    for Luma([v]) in img.pixels_mut() {
        *v = (((*v - lo) as f32 / range) * 255.0).round() as u8;
    }
    img
}

fn binarise(mut img: GrayImage, level: u8) -> GrayImage {
    for Luma([v]) in img.pixels_mut() {
        *v = if *v >= level { 255 } else { 0 };
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn sample() -> DynamicImage {
        let img = RgbImage::from_fn(4, 4, |x, y| {
            image::Rgb([(x * 40 + 60) as u8, (y * 40 + 60) as u8, 100])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn original_is_identity() {
        let img = sample();
        let out = EnhanceStrategy::Original.apply(img.clone());
        assert_eq!(out.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn contrast_stretch_reaches_full_range() {
        let out = EnhanceStrategy::ContrastStretch.apply(sample()).to_luma8();
        let values: Vec<u8> = out.pixels().map(|Luma([v])| *v).collect();
        assert_eq!(values.iter().min(), Some(&0));
        assert_eq!(values.iter().max(), Some(&255));
    }

    #[test]
    fn contrast_stretch_leaves_flat_image_alone() {
        let flat = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([100])));
        let out = EnhanceStrategy::ContrastStretch.apply(flat).to_luma8();
        assert!(out.pixels().all(|Luma([v])| *v == 100));
    }

    #[test]
    fn threshold_produces_only_black_and_white() {
        let out = EnhanceStrategy::Threshold.apply(sample()).to_luma8();
        assert!(out.pixels().all(|Luma([v])| *v == 0 || *v == 255));
    }

    #[test]
    fn strategies_preserve_dimensions() {
        for strategy in [
            EnhanceStrategy::Original,
            EnhanceStrategy::Grayscale,
            EnhanceStrategy::ContrastStretch,
            EnhanceStrategy::Threshold,
            EnhanceStrategy::Sharpen,
        ] {
            let out = strategy.apply(sample());
            assert_eq!((out.width(), out.height()), (4, 4), "{}", strategy.as_str());
        }
    }

    #[test]
    fn report_identifiers_are_stable() {
        assert_eq!(EnhanceStrategy::Original.as_str(), "original");
        assert_eq!(EnhanceStrategy::ContrastStretch.as_str(), "contrast-stretch");
    }
}
