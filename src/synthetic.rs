// Deterministic textured test images.

use crate::all::*;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

struct Blob {
  center: Vector2d,
  sigma: f64,
  amplitude: f64,
}

fn blobs(width: usize, height: usize, seed: u64) -> Vec<Blob> {
  let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
  // Spill over the borders so that shifted images have texture everywhere.
  let pad = 20.;
  let count = width * height / 60;
  (0..count).map(|_| {
    let sign = if rng.gen_bool(0.5) { 1. } else { -1. };
    Blob {
      center: Vector2d::new(
        rng.gen_range(-pad..(width as f64 + pad)),
        rng.gen_range(-pad..(height as f64 + pad)),
      ),
      sigma: rng.gen_range(2.0..4.0),
      amplitude: sign * rng.gen_range(30.0..70.0),
    }
  }).collect()
}

// Smooth random texture. Content moves by `shift` pixels: the value at `p`
// equals the value of the unshifted texture at `p - shift`.
pub fn blob_texture(width: usize, height: usize, shift: Vector2d, seed: u64) -> Image {
  let blobs = blobs(width, height, seed);
  Image::from_fn(width, height, |x, y| {
    let p = Vector2d::new(x as f64, y as f64) - shift;
    let mut v = 128.;
    for blob in &blobs {
      let d2 = (p - blob.center).norm_squared();
      if d2 > 25. * blob.sigma * blob.sigma { continue }
      v += blob.amplitude * (-0.5 * d2 / (blob.sigma * blob.sigma)).exp();
    }
    v.round().clamp(0., 255.) as u8
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_integer_shift_is_exact() {
    let image0 = blob_texture(50, 40, Vector2d::zeros(), 7);
    let image1 = blob_texture(50, 40, Vector2d::new(5., 0.), 7);
    for y in 0..40 {
      for x in 5..50 {
        assert_eq!(image1.value(x, y), image0.value(x - 5, y));
      }
    }
  }

  #[test]
  fn test_seed_changes_texture() {
    let image0 = blob_texture(30, 30, Vector2d::zeros(), 1);
    let image1 = blob_texture(30, 30, Vector2d::zeros(), 2);
    assert_ne!(image0, image1);
  }
}
