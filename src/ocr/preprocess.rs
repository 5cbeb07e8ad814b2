use image::{GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::open;

use crate::layout::PixelRect;

/// Gaussian sigma for noise suppression before equalization.
const BLUR_SIGMA: f32 = 0.5;

/// CLAHE tile grid (tiles per axis).
const CLAHE_GRID: u32 = 8;

/// CLAHE clip limit, relative to the uniform histogram height.
const CLAHE_CLIP_LIMIT: f32 = 3.0;

/// Chebyshev radius of the stroke-closing kernel (1 = 3×3).
const CLOSING_RADIUS: u8 = 1;

/// Converts a color region into a binary image tuned for Tesseract.
///
/// grayscale → blur → CLAHE → Otsu binarization → closing of the dark strokes.
/// Pure function: identical input yields identical output.
pub fn preprocess_for_ocr(img: &RgbaImage) -> GrayImage {
    let gray = image::imageops::grayscale(img);
    if gray.width() == 0 || gray.height() == 0 {
        return gray;
    }

    let denoised = gaussian_blur_f32(&gray, BLUR_SIGMA);
    let enhanced = equalize_adaptive(&denoised, CLAHE_GRID, CLAHE_CLIP_LIMIT);
    let binary = binarize_otsu(&enhanced);
    close_strokes(&binary, CLOSING_RADIUS)
}

/// Bridges white gaps of up to `2 * radius` pixels inside dark strokes.
/// Radius 0 leaves the image unchanged.
pub fn close_strokes(binary: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return binary.clone();
    }
    // Text is dark on white: opening the white background closes the ink.
    open(binary, Norm::LInf, radius)
}

/// Global binarization at the Otsu level. Pixels above the level become white.
pub fn binarize_otsu(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Contrast limited adaptive histogram equalization.
///
/// The image is split into a `grid`×`grid` tile layout. Each tile gets its own
/// equalization mapping with histogram bins clipped at `clip_limit` times the
/// uniform bin height (excess redistributed evenly). Output pixels blend the
/// mappings of the four nearest tile centers bilinearly.
pub fn equalize_adaptive(img: &GrayImage, grid: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let tiles_x = grid.clamp(1, width);
    let tiles_y = grid.clamp(1, height);

    let x_bounds: Vec<u32> = (0..=tiles_x).map(|t| t * width / tiles_x).collect();
    let y_bounds: Vec<u32> = (0..=tiles_y).map(|t| t * height / tiles_y).collect();

    let mut luts: Vec<[u8; 256]> = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y as usize {
        for tx in 0..tiles_x as usize {
            let mut hist = [0u32; 256];
            for y in y_bounds[ty]..y_bounds[ty + 1] {
                for x in x_bounds[tx]..x_bounds[tx + 1] {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = (x_bounds[tx + 1] - x_bounds[tx]) * (y_bounds[ty + 1] - y_bounds[ty]);
            luts.push(tile_mapping(&mut hist, area, clip_limit));
        }
    }

    let centers_x: Vec<f32> = (0..tiles_x as usize)
        .map(|t| (x_bounds[t] + x_bounds[t + 1]) as f32 / 2.0)
        .collect();
    let centers_y: Vec<f32> = (0..tiles_y as usize)
        .map(|t| (y_bounds[t] + y_bounds[t + 1]) as f32 / 2.0)
        .collect();

    let lut_at = |tx: usize, ty: usize| &luts[ty * tiles_x as usize + tx];

    ImageBuffer::from_fn(width, height, |x, y| {
        let (x0, x1, fx) = neighbours(&centers_x, x as f32 + 0.5);
        let (y0, y1, fy) = neighbours(&centers_y, y as f32 + 0.5);
        let v = img.get_pixel(x, y)[0] as usize;

        let top = lut_at(x0, y0)[v] as f32 * (1.0 - fx) + lut_at(x1, y0)[v] as f32 * fx;
        let bottom = lut_at(x0, y1)[v] as f32 * (1.0 - fx) + lut_at(x1, y1)[v] as f32 * fx;
        let value = top * (1.0 - fy) + bottom * fy;

        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Builds the clipped-histogram equalization table of one tile.
fn tile_mapping(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = i as u8;
        }
        return lut;
    }

    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let bonus = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += bonus;
        if i < remainder {
            *bin += 1;
        }
    }

    let scale = 255.0 / area as f32;
    let mut cumulative = 0u32;
    for (i, bin) in hist.iter().enumerate() {
        cumulative += bin;
        lut[i] = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Finds the two tile centers around `pos` and the blend weight of the second.
fn neighbours(centers: &[f32], pos: f32) -> (usize, usize, f32) {
    let last = centers.len() - 1;
    if pos <= centers[0] {
        return (0, 0, 0.0);
    }
    if pos >= centers[last] {
        return (last, last, 0.0);
    }
    let upper = centers.iter().position(|&c| c > pos).unwrap_or(last);
    let lower = upper - 1;
    let span = centers[upper] - centers[lower];
    let weight = if span > 0.0 {
        (pos - centers[lower]) / span
    } else {
        0.0
    };
    (lower, upper, weight)
}

/// Crops a pixel rectangle from an image, clipped to the image bounds.
///
/// Returns `None` when the clipped rectangle is empty.
pub fn crop_region(img: &RgbaImage, region: &PixelRect) -> Option<ImageBuffer<Rgba<u8>, Vec<u8>>> {
    let (w, h) = img.dimensions();
    let clipped = region.clip_to(w, h)?;
    Some(
        image::imageops::crop_imm(img, clipped.x, clipped.y, clipped.width, clipped.height)
            .to_image(),
    )
}
