// Shi-Tomasi "good features to track" corner detector: the corner response is
// the smaller eigenvalue of the gradient structure tensor summed over a block.

use crate::all::*;

pub struct Detector {
  max_corners: usize,
  quality_level: f64,
  min_distance: f64,
  block_size: usize,
  tmp: Tmp,
}

// Workspace reused between calls.
#[derive(Default)]
struct Tmp {
  gxx: Vec<f64>,
  gyy: Vec<f64>,
  gxy: Vec<f64>,
  box_rows: Vec<f64>,
  response: Vec<f64>,
  candidates: Vec<(usize, f64)>,
}

impl Detector {
  pub fn new(p: &ParameterSet) -> Detector {
    Detector {
      max_corners: p.max_corners,
      quality_level: p.quality_level,
      min_distance: p.min_distance,
      block_size: p.block_size,
      tmp: Tmp::default(),
    }
  }

  // Detections are sorted by decreasing corner response.
  pub fn process(&mut self, image: &Image, detections: &mut Vec<Vector2d>) {
    detections.clear();
    let w = image.width;
    let h = image.height;
    let r = self.block_size / 2;
    // Skip borders where the block would rely on replicated pixels.
    let margin = r + 1;
    if w <= 2 * margin || h <= 2 * margin { return }

    let t = &mut self.tmp;
    structure_tensor(image, &mut t.gxx, &mut t.gyy, &mut t.gxy);
    box_sum(&mut t.gxx, &mut t.box_rows, w, h, r);
    box_sum(&mut t.gyy, &mut t.box_rows, w, h, r);
    box_sum(&mut t.gxy, &mut t.box_rows, w, h, r);

    t.response.clear();
    t.response.resize(w * h, 0.);
    let mut max_response = 0.;
    for y in margin..(h - margin) {
      for x in margin..(w - margin) {
        let i = y * w + x;
        let lambda = min_eigenvalue(t.gxx[i], t.gyy[i], t.gxy[i]);
        t.response[i] = lambda;
        if lambda > max_response { max_response = lambda }
      }
    }
    if max_response <= 0. { return }

    let threshold = self.quality_level * max_response;
    t.candidates.clear();
    for y in margin..(h - margin) {
      for x in margin..(w - margin) {
        let i = y * w + x;
        let v = t.response[i];
        if v < threshold || v <= 0. { continue }
        if !is_local_maximum(&t.response, w, x, y) { continue }
        t.candidates.push((i, v));
      }
    }
    // Ties broken by raster order to keep the output deterministic.
    t.candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let min_distance2 = self.min_distance * self.min_distance;
    for &(i, _) in &t.candidates {
      if detections.len() >= self.max_corners { break }
      let p = Vector2d::new((i % w) as f64, (i / w) as f64);
      if detections.iter().any(|q| (p - q).norm_squared() < min_distance2) { continue }
      detections.push(p);
    }
  }
}

fn min_eigenvalue(xx: f64, yy: f64, xy: f64) -> f64 {
  let half_trace = 0.5 * (xx + yy);
  let d = 0.5 * (xx - yy);
  half_trace - (d * d + xy * xy).sqrt()
}

fn is_local_maximum(response: &[f64], w: usize, x: usize, y: usize) -> bool {
  let v = response[y * w + x];
  for ny in (y - 1)..=(y + 1) {
    for nx in (x - 1)..=(x + 1) {
      if response[ny * w + nx] > v { return false }
    }
  }
  true
}

// Per pixel products of Sobel gradients.
fn structure_tensor(
  image: &Image,
  gxx: &mut Vec<f64>,
  gyy: &mut Vec<f64>,
  gxy: &mut Vec<f64>,
) {
  let w = image.width;
  let h = image.height;
  for v in [&mut *gxx, &mut *gyy, &mut *gxy] {
    v.clear();
    v.resize(w * h, 0.);
  }
  let p = |x: i32, y: i32| image.value_clamped(x, y) as f64;
  for y in 0..h as i32 {
    for x in 0..w as i32 {
      let gx = (p(x + 1, y - 1) + 2. * p(x + 1, y) + p(x + 1, y + 1)
        - p(x - 1, y - 1) - 2. * p(x - 1, y) - p(x - 1, y + 1)) / 8.;
      let gy = (p(x - 1, y + 1) + 2. * p(x, y + 1) + p(x + 1, y + 1)
        - p(x - 1, y - 1) - 2. * p(x, y - 1) - p(x + 1, y - 1)) / 8.;
      let i = y as usize * w + x as usize;
      gxx[i] = gx * gx;
      gyy[i] = gy * gy;
      gxy[i] = gx * gy;
    }
  }
}

// In-place sum over a (2r + 1) x (2r + 1) box, with border replication.
fn box_sum(data: &mut Vec<f64>, rows: &mut Vec<f64>, w: usize, h: usize, r: usize) {
  let r = r as i32;
  let clamp = |v: i32, n: usize| v.clamp(0, n as i32 - 1) as usize;
  rows.clear();
  rows.resize(w * h, 0.);
  for y in 0..h {
    for x in 0..w as i32 {
      let mut sum = 0.;
      for k in -r..=r {
        sum += data[y * w + clamp(x + k, w)];
      }
      rows[y * w + x as usize] = sum;
    }
  }
  for y in 0..h as i32 {
    for x in 0..w {
      let mut sum = 0.;
      for k in -r..=r {
        sum += rows[clamp(y + k, h) * w + x];
      }
      data[y as usize * w + x] = sum;
    }
  }
}
