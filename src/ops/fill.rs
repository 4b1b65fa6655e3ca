use std::collections::VecDeque;

use image::{Rgba, RgbaImage};

/// 4-connected flood fill starting at `seed`.
///
/// A pixel is repainted only when its color equals `target` exactly, so
/// antialiased or translucent borders stop the fill. The traversal uses an
/// explicit FIFO worklist (no recursion) and each pixel is recolored as it is
/// enqueued, which doubles as the visited marker. Returns the number of
/// pixels repainted; zero when the seed is out of bounds, does not match
/// `target`, or `target == replacement`.
pub fn flood_fill(image: &mut RgbaImage, seed: (u32, u32), target: Rgba<u8>, replacement: Rgba<u8>) -> usize {
    let (w, h) = image.dimensions();
    if seed.0 >= w || seed.1 >= h || target == replacement {
        return 0;
    }
    if *image.get_pixel(seed.0, seed.1) != target {
        return 0;
    }

    let mut queue: VecDeque<(u32, u32)> = VecDeque::with_capacity(4096);
    image.put_pixel(seed.0, seed.1, replacement);
    queue.push_back(seed);
    let mut filled = 1usize;

    while let Some((x, y)) = queue.pop_front() {
        let neighbors = [
            (x.checked_sub(1), Some(y)),
            (x.checked_add(1).filter(|&nx| nx < w), Some(y)),
            (Some(x), y.checked_sub(1)),
            (Some(x), y.checked_add(1).filter(|&ny| ny < h)),
        ];
        for (nx, ny) in neighbors {
            let (Some(nx), Some(ny)) = (nx, ny) else { continue };
            if *image.get_pixel(nx, ny) == target {
                image.put_pixel(nx, ny, replacement);
                queue.push_back((nx, ny));
                filled += 1;
            }
        }
    }

    filled
}

/// Flood fill whose target is whatever color currently sits under `seed`.
pub fn flood_fill_at(image: &mut RgbaImage, seed: (u32, u32), replacement: Rgba<u8>) -> usize {
    match image.get_pixel_checked(seed.0, seed.1) {
        Some(&target) => flood_fill(image, seed, target, replacement),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn fill_stops_at_walls() {
        let mut img = RgbaImage::from_pixel(10, 10, WHITE);
        for y in 0..10 {
            img.put_pixel(5, y, BLACK);
        }
        let n = flood_fill_at(&mut img, (1, 1), BLUE);
        assert_eq!(n, 50);
        assert_eq!(*img.get_pixel(4, 9), BLUE);
        assert_eq!(*img.get_pixel(5, 3), BLACK);
        assert_eq!(*img.get_pixel(6, 3), WHITE);
    }

    #[test]
    fn fill_is_four_connected() {
        // Diagonal gap must not leak
        let mut img = RgbaImage::from_pixel(3, 3, BLACK);
        img.put_pixel(0, 0, WHITE);
        img.put_pixel(1, 1, WHITE);
        assert_eq!(flood_fill_at(&mut img, (0, 0), BLUE), 1);
        assert_eq!(*img.get_pixel(1, 1), WHITE);
    }

    #[test]
    fn near_miss_colors_are_boundaries() {
        let mut img = RgbaImage::from_pixel(4, 1, WHITE);
        img.put_pixel(2, 0, Rgba([255, 255, 254, 255]));
        assert_eq!(flood_fill_at(&mut img, (0, 0), BLUE), 2);
        assert_eq!(*img.get_pixel(3, 0), WHITE);
    }

    #[test]
    fn same_color_is_noop() {
        let mut img = RgbaImage::from_pixel(4, 4, BLUE);
        assert_eq!(flood_fill_at(&mut img, (2, 2), BLUE), 0);
        assert_eq!(flood_fill(&mut img, (9, 9), BLUE, WHITE), 0);
    }

    #[test]
    fn mismatched_target_is_noop() {
        let mut img = RgbaImage::from_pixel(4, 4, WHITE);
        assert_eq!(flood_fill(&mut img, (0, 0), BLACK, BLUE), 0);
        assert!(img.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn large_fill_does_not_overflow_stack() {
        let mut img = RgbaImage::from_pixel(2048, 2048, WHITE);
        assert_eq!(flood_fill_at(&mut img, (1024, 1024), BLACK), 2048 * 2048);
    }
}
