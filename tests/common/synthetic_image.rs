#![allow(dead_code)]

use sobel_stream::image::{Frame, Plane};

/// High-contrast RGB checkerboard.
pub fn checkerboard_rgb(width: usize, height: usize, cell: usize) -> Frame {
    assert!(cell > 0, "cell size must be positive");
    Frame::from_fn(width, height, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            [32, 40, 24]
        } else {
            [220, 210, 235]
        }
    })
}

/// Deterministic pseudo-random RGB noise (64-bit LCG).
pub fn noise_rgb(width: usize, height: usize, seed: u64) -> Frame {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    Frame::from_fn(width, height, |_, _| {
        let mut px = [0u8; 3];
        for c in &mut px {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            *c = (state >> 56) as u8;
        }
        px
    })
}

/// Luminance plane with a vertical dark/light step at column `step`.
pub fn vertical_step(width: usize, height: usize, step: usize) -> Plane {
    let data = (0..width * height)
        .map(|i| if i % width < step { 0 } else { 255 })
        .collect();
    Plane::from_vec(width, height, data)
}
