//! Shared helpers for integration tests

#![allow(dead_code)]

use matte_refine::PixelBuffer;

/// Small deterministic xorshift32 generator for reproducible fixtures
pub struct XorShift(u32);

impl XorShift {
    pub fn new(seed: u32) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    pub fn next_u8(&mut self) -> u8 {
        (self.next_u32() >> 24) as u8
    }

    pub fn chance(&mut self, percent: u32) -> bool {
        self.next_u32() % 100 < percent
    }
}

/// Buffer of random RGBA noise
pub fn noise_buffer(width: u32, height: u32, seed: u32) -> PixelBuffer {
    let mut rng = XorShift::new(seed);
    let data = (0..width * height * 4).map(|_| rng.next_u8()).collect();
    PixelBuffer::new(width, height, data).unwrap()
}

/// Opaque gray buffer carrying `alpha` as its alpha plane
pub fn buffer_with_alpha(width: u32, height: u32, alpha: &[u8]) -> PixelBuffer {
    let mut buffer = PixelBuffer::filled(width, height, [128, 128, 128, 255]).unwrap();
    buffer.write_alpha_plane(alpha);
    buffer
}

/// Random 0/255 mask with a zero margin of `margin` pixels on every side
pub fn random_binary_mask(width: u32, height: u32, margin: u32, seed: u32) -> Vec<u8> {
    let mut rng = XorShift::new(seed);
    let mut mask = vec![0u8; (width * height) as usize];
    for y in margin..height - margin {
        for x in margin..width - margin {
            if rng.chance(55) {
                mask[(y * width + x) as usize] = 255;
            }
        }
    }
    mask
}
