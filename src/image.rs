use crate::all::*;

// Row-major 8-bit grayscale image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Image {
  pub data: Vec<u8>,
  pub width: usize,
  pub height: usize,
}

impl Image {
  pub fn empty() -> Image {
    Image {
      data: vec![],
      width: 0,
      height: 0,
    }
  }

  pub fn new(width: usize, height: usize) -> Image {
    Image {
      data: vec![0; width * height],
      width,
      height,
    }
  }

  pub fn from_fn<F: Fn(usize, usize) -> u8>(width: usize, height: usize, f: F) -> Image {
    let mut image = Image::new(width, height);
    for y in 0..height {
      for x in 0..width {
        image.set_value(x, y, f(x, y));
      }
    }
    image
  }

  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  #[inline(always)]
  pub fn value(&self, x: usize, y: usize) -> u8 {
    self.data[y * self.width + x]
  }

  // Replicates border pixels for coordinates outside the image.
  #[inline(always)]
  pub fn value_clamped(&self, x: i32, y: i32) -> u8 {
    let x = x.clamp(0, self.width as i32 - 1) as usize;
    let y = y.clamp(0, self.height as i32 - 1) as usize;
    self.data[y * self.width + x]
  }

  #[inline(always)]
  pub fn set_value(&mut self, x: usize, y: usize, value: u8) {
    self.data[y * self.width + x] = value;
  }

  // Bilinear interpolation with border replication. Coordinate (0, 0) is the
  // center of the top-left pixel.
  #[inline(always)]
  pub fn bilinear(&self, u: Vector2d) -> f64 {
    let x0f = u[0].floor();
    let y0f = u[1].floor();
    let xa = u[0] - x0f;
    let ya = u[1] - y0f;
    let x0 = x0f as i32;
    let y0 = y0f as i32;
    let v00 = self.value_clamped(x0, y0) as f64;
    let v10 = self.value_clamped(x0 + 1, y0) as f64;
    let v01 = self.value_clamped(x0, y0 + 1) as f64;
    let v11 = self.value_clamped(x0 + 1, y0 + 1) as f64;
    (1. - xa) * (1. - ya) * v00
      + xa * (1. - ya) * v10
      + (1. - xa) * ya * v01
      + xa * ya * v11
  }

  pub fn contains(&self, u: Vector2d) -> bool {
    u[0] >= 0. && u[1] >= 0.
      && u[0] <= (self.width as f64 - 1.)
      && u[1] <= (self.height as f64 - 1.)
  }
}
