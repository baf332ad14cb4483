use image::GrayImage;
use rayon::prelude::*;

/// A detected corner: pixel position plus its FAST score.
///
/// The score is the sum of absolute differences between the center pixel and
/// the pixels of the winning circle arc, beyond the detection threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keypoint {
    /// Column of the corner.
    pub x: u32,
    /// Row of the corner.
    pub y: u32,
    /// FAST corner score (higher is stronger).
    pub score: i32,
}

/// Relative offsets of the 16-pixel Bresenham circle of radius 3, clockwise
/// from the top, in row-major index space for an image `cols` pixels wide.
fn circle_offsets(cols: i64) -> [i64; 16] {
    [
        -3 * cols,
        -3 * cols + 1,
        -2 * cols + 2,
        -cols + 3,
        3,
        cols + 3,
        2 * cols + 2,
        3 * cols + 1,
        3 * cols,
        3 * cols - 1,
        2 * cols - 2,
        cols - 3,
        -3,
        -cols - 3,
        -2 * cols - 2,
        -3 * cols - 1,
    ]
}

/// Detect FAST corners.
///
/// A pixel is a corner when at least `arc_length` consecutive pixels of its
/// Bresenham circle are all brighter than `center + threshold` or all darker
/// than `center - threshold`. Rows are scanned in parallel; the returned
/// keypoints are in row-major order and carry their corner score.
///
/// Images smaller than 7x7 have no interior ring and yield no corners.
///
/// # Arguments
///
/// * `src` - The source grayscale image.
/// * `threshold` - Minimum absolute intensity difference to the center pixel.
/// * `arc_length` - Required number of consecutive circle pixels (9 for FAST-9).
pub fn detect_corners(src: &GrayImage, threshold: u8, arc_length: u8) -> Vec<Keypoint> {
    let (cols, rows) = (src.width() as i64, src.height() as i64);
    if cols < 7 || rows < 7 || arc_length == 0 || arc_length > 16 {
        return Vec::new();
    }

    let offsets = circle_offsets(cols);
    let data = src.as_raw().as_slice();

    (3..rows - 3)
        .into_par_iter()
        .flat_map(|y| {
            let mut row_keypoints = Vec::new();
            for x in 3..cols - 3 {
                if let Some(score) = corner_score(data, y * cols + x, &offsets, threshold, arc_length)
                {
                    row_keypoints.push(Keypoint {
                        x: x as u32,
                        y: y as u32,
                        score,
                    });
                }
            }
            row_keypoints
        })
        .collect()
}

/// Detect FAST corners and suppress non-maxima in each 3x3 neighborhood.
///
/// The surviving keypoints are ordered by descending score, with ties broken
/// by row-major position so the output is fully deterministic.
pub fn detect_corners_nms(src: &GrayImage, threshold: u8, arc_length: u8) -> Vec<Keypoint> {
    let keypoints = detect_corners(src, threshold, arc_length);
    suppress_nonmax(keypoints, src.width(), src.height())
}

/// Score a single candidate pixel. Returns `None` when it is not a corner.
fn corner_score(
    data: &[u8],
    pixel_idx: i64,
    offsets: &[i64; 16],
    threshold: u8,
    arc_length: u8,
) -> Option<i32> {
    let center = data[pixel_idx as usize];
    let lower = center.saturating_sub(threshold);
    let upper = center.saturating_add(threshold);

    let circle_pixel = |i: usize| data[(pixel_idx + offsets[i]) as usize];

    // High-speed test on the four compass pixels: a full arc of length >= 9
    // needs at least three of them on the same side of the thresholds.
    if arc_length >= 9 {
        let (mut brighter, mut darker) = (0u8, 0u8);
        for i in [0, 4, 8, 12] {
            let p = circle_pixel(i);
            brighter += (p > upper) as u8;
            darker += (p < lower) as u8;
        }
        if brighter < 3 && darker < 3 {
            return None;
        }
    }

    let mut bright_bits = 0u16;
    let mut dark_bits = 0u16;
    for i in 0..16 {
        let p = circle_pixel(i);
        bright_bits |= ((p > upper) as u16) << i;
        dark_bits |= ((p < lower) as u16) << i;
    }

    let arc_start = find_arc(bright_bits, arc_length).or_else(|| find_arc(dark_bits, arc_length))?;

    // Sum of absolute differences over the winning arc, per Rosten's score.
    let mut score = 0i32;
    for i in arc_start..arc_start + arc_length as usize {
        let p = circle_pixel(i % 16);
        score += center.abs_diff(p) as i32 - threshold as i32;
    }

    Some(score)
}

/// Find the start index of the first run of `arc_length` consecutive set bits
/// on the 16-bit circle, allowing wrap-around.
fn find_arc(bits: u16, arc_length: u8) -> Option<usize> {
    let doubled = (bits as u32) | ((bits as u32) << 16);
    let window = (1u32 << arc_length) - 1;
    (0..16).find(|&start| (doubled >> start) & window == window)
}

/// Keep only keypoints that are local score maxima in their 3x3 neighborhood.
///
/// Strongest-first greedy suppression: a kept keypoint claims its eight
/// neighbors, weaker keypoints landing on a claimed pixel are dropped.
fn suppress_nonmax(mut keypoints: Vec<Keypoint>, width: u32, height: u32) -> Vec<Keypoint> {
    keypoints.sort_unstable_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| (a.y, a.x).cmp(&(b.y, b.x)))
    });

    let (w, h) = (width as i64, height as i64);
    let mut claimed = vec![false; (w * h) as usize];
    let mut kept = Vec::new();

    for kp in keypoints {
        let idx = (kp.y as i64 * w + kp.x as i64) as usize;
        if claimed[idx] {
            continue;
        }
        kept.push(kp);
        for dy in -1..=1i64 {
            for dx in -1..=1i64 {
                let (nx, ny) = (kp.x as i64 + dx, kp.y as i64 + dy);
                if nx >= 0 && ny >= 0 && nx < w && ny < h {
                    claimed[(ny * w + nx) as usize] = true;
                }
            }
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32, pixels: Vec<u8>) -> GrayImage {
        GrayImage::from_raw(width, height, pixels).expect("bad test image")
    }

    #[test]
    fn test_detect_corners_cross() {
        #[rustfmt::skip]
        let img = gray(7, 7, vec![
            50,  50,  50,  50,  50,  50,  50,
            50,  50,  50,  50,  50,  50,  50,
            50,  50,  50, 200,  50,  50,  50,
            50,  50, 200, 200, 200,  50,  50,
            50,  50,  50, 200,  50,  50,  50,
            50,  50,  50,  50,  50,  50,  50,
            50,  50,  50,  50,  50,  50,  50,
        ]);
        let keypoints = detect_corners(&img, 100, 9);
        assert_eq!(keypoints.len(), 1);
        assert_eq!((keypoints[0].x, keypoints[0].y), (3, 3));
        assert!(keypoints[0].score > 0);
    }

    #[test]
    fn test_detect_corners_flat_image() {
        let img = gray(16, 16, vec![128; 256]);
        assert!(detect_corners(&img, 20, 9).is_empty());
    }

    #[test]
    fn test_detect_corners_tiny_image() {
        let img = gray(6, 6, vec![0; 36]);
        assert!(detect_corners(&img, 20, 9).is_empty());
    }

    #[test]
    fn test_nms_keeps_strongest() {
        #[rustfmt::skip]
        let img = gray(8, 7, vec![
            50,  50,  50,  50,  50,  50,  50,  50,
            50,  50,  50,  50,  50,  50,  50,  50,
            50,  50,  50, 200, 255,  50,  50,  50,
            50,  50, 200, 200, 200, 200,  50,  50,
            50,  50,  50, 200, 200,  50,  50,  50,
            50,  50,  50,  50,  50,  50,  50,  50,
            50,  50,  50,  50,  50,  50,  50,  50,
        ]);
        let raw = detect_corners(&img, 100, 9);
        let kept = detect_corners_nms(&img, 100, 9);
        assert!(kept.len() <= raw.len());
        assert!(!kept.is_empty());
        // Kept corners are at least 2 apart in chebyshev distance.
        for (i, a) in kept.iter().enumerate() {
            for b in kept.iter().skip(i + 1) {
                let dx = a.x.abs_diff(b.x);
                let dy = a.y.abs_diff(b.y);
                assert!(dx.max(dy) >= 2, "{a:?} and {b:?} too close");
            }
        }
    }

    #[test]
    fn test_find_arc_wraps_around() {
        // Bits 14, 15, 0..=6 set: a 9-long arc crossing the seam.
        let bits = 0b1100_0000_0111_1111u16;
        assert_eq!(find_arc(bits, 9), Some(14));
        assert_eq!(find_arc(bits, 10), None);
    }

    #[test]
    fn test_detect_is_deterministic() {
        #[rustfmt::skip]
        let img = gray(7, 7, vec![
            200, 200, 200,  50,  50,  50,  50,
            200, 200, 200,  50,  50,  50,  50,
            200, 200, 200,  50,  50,  50,  50,
            200, 200, 200, 200,  50,  50,  50,
            200, 200, 200,  50,  50,  50,  50,
            200, 200, 200,  50,  50,  50,  50,
            200, 200, 200,  50,  50,  50,  50,
        ]);
        let a = detect_corners_nms(&img, 100, 9);
        let b = detect_corners_nms(&img, 100, 9);
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert_eq!((a[0].x, a[0].y), (3, 3));
    }
}
