// Pyramidal Lucas-Kanade tracker based on:
// <http://robots.stanford.edu/cs223b04/algo_tracking.pdf>
// “Pyramidal Implementation of the Lucas Kanade Feature Tracker
//   Description of the algorithm” by Jean-Yves Bouguet

use crate::all::*;

#[allow(non_snake_case)]
pub struct OpticalFlow {
  lk_iters: usize,
  lk_levels: usize,
  lk_win_size: usize,
  lk_epsilon: f64,
  lk_min_eigenvalue: f64,
  lk_max_residual: f64,
  Ix: Matrixd,
  Iy: Matrixd,
  It: Matrixd,
  // Workspace.
  grid0: Matrixd,
  grid1: Matrixd,
}

impl OpticalFlow {
  pub fn new(p: &ParameterSet) -> Result<OpticalFlow> {
    if p.lk_win_size % 2 != 1 {
      bail!("Lucas-Kanade window size must be odd number.");
    }
    if p.lk_win_size < 3 {
      bail!("Lucas-Kanade window size must be at least 3.");
    }
    Ok(OpticalFlow {
      lk_iters: p.lk_iters,
      lk_levels: p.lk_levels,
      lk_win_size: p.lk_win_size,
      lk_epsilon: p.lk_epsilon,
      lk_min_eigenvalue: p.lk_min_eigenvalue,
      lk_max_residual: p.lk_max_residual,
      Ix: DMatrix::zeros(p.lk_win_size, p.lk_win_size),
      Iy: DMatrix::zeros(p.lk_win_size, p.lk_win_size),
      It: DMatrix::zeros(p.lk_win_size, p.lk_win_size),
      grid0: DMatrix::zeros(p.lk_win_size + 2, p.lk_win_size + 2),
      grid1: DMatrix::zeros(p.lk_win_size, p.lk_win_size),
    })
  }

  // Fills `features1` and `statuses` with one entry per element of
  // `features0`. Failed features keep their original coordinates.
  pub fn process(
    &mut self,
    frame0: &Frame,
    frame1: &Frame,
    features0: &[Vector2d],
    features1: &mut Vec<Vector2d>,
    statuses: &mut Vec<bool>,
  ) {
    features1.clear();
    statuses.clear();
    for feature0 in features0 {
      match self.process_feature(frame0, frame1, *feature0) {
        Some(feature1) if frame1.image.contains(feature1) => {
          features1.push(feature1);
          statuses.push(true);
        },
        _ => {
          features1.push(*feature0);
          statuses.push(false);
        },
      }
    }
  }

  #[allow(non_snake_case)]
  fn process_feature(
    &mut self,
    frame0: &Frame,
    frame1: &Frame,
    feature0: Vector2d,
  ) -> Option<Vector2d> {
    let r = (self.lk_win_size - 1) / 2;
    let area = (self.lk_win_size * self.lk_win_size) as f64;
    let level_count = usize::min(
      self.lk_levels + 1,
      usize::min(frame0.level_count(), frame1.level_count()),
    );
    let mut g = Vector2d::zeros();
    for L in (0..level_count).rev() {
      let level0 = frame0.get_level(L);
      let level1 = frame1.get_level(L);
      let u = feature0 / u32::pow(2, L as u32) as f64;
      // One pixel of padding for the derivative kernel.
      fill_grid(level0, u, r + 1, &mut self.grid0);
      scharr(&self.grid0, &mut self.Ix, &mut self.Iy);
      let G = spatial_gradient(&self.Ix, &self.Iy);
      if min_eigenvalue(&G) / area < self.lk_min_eigenvalue {
        return None;
      }
      let inv_G = G.try_inverse()?;
      let mut nu = Vector2d::zeros();
      for _ in 0..self.lk_iters {
        fill_grid(level1, u + g + nu, r, &mut self.grid1);
        image_difference(&self.grid0, &self.grid1, &mut self.It);
        let eta = inv_G * mismatch_vector(&self.Ix, &self.Iy, &self.It);
        nu += eta;
        if !nu[0].is_finite() || !nu[1].is_finite() { return None }
        if eta.norm() < self.lk_epsilon { break }
      }
      g = if L > 0 { 2. * (g + nu) } else { g + nu };
    }

    // Reject windows that do not match at the final position.
    fill_grid(frame1.get_level(0), feature0 + g, r, &mut self.grid1);
    image_difference(&self.grid0, &self.grid1, &mut self.It);
    if mean_absolute(&self.It) > self.lk_max_residual {
      return None;
    }
    Some(feature0 + g)
  }
}

// `It = I0 - I1`, where `I0` is the template grid without its padding.
#[allow(non_snake_case)]
fn image_difference(I0: &Matrixd, I1: &Matrixd, It: &mut Matrixd) {
  It.copy_from(&I0.slice((1, 1), (I1.nrows(), I1.ncols())));
  *It -= I1;
}

fn mean_absolute(m: &Matrixd) -> f64 {
  if m.is_empty() { return 0. }
  m.iter().map(|v| v.abs()).sum::<f64>() / m.len() as f64
}

#[allow(non_snake_case)]
fn mismatch_vector(Ix: &Matrixd, Iy: &Matrixd, It: &Matrixd) -> Vector2d {
  Vector2d::new(It.dot(Ix), It.dot(Iy))
}

#[allow(non_snake_case)]
fn spatial_gradient(Ix: &Matrixd, Iy: &Matrixd) -> Matrix2d {
  assert_eq!(Ix.nrows(), Iy.nrows());
  assert_eq!(Ix.ncols(), Iy.ncols());
  let x2 = Ix.dot(Ix);
  let y2 = Iy.dot(Iy);
  let xy = Ix.dot(Iy);
  Matrix2d::new(x2, xy, xy, y2)
}

#[allow(non_snake_case)]
fn min_eigenvalue(G: &Matrix2d) -> f64 {
  let half_trace = 0.5 * (G[(0, 0)] + G[(1, 1)]);
  let d = 0.5 * (G[(0, 0)] - G[(1, 1)]);
  half_trace - (d * d + G[(0, 1)] * G[(1, 0)]).sqrt()
}

// Samples a (2r + 1) x (2r + 1) grid centered at sub-pixel `center`.
fn fill_grid(
  level: &Image,
  center: Vector2d,
  r: usize,
  grid: &mut Matrixd,
) {
  let n = 2 * r + 1;
  if grid.nrows() != n || grid.ncols() != n {
    *grid = DMatrix::zeros(n, n);
  }
  let r = r as i32;
  for (y_ind, y) in (-r..=r).enumerate() {
    for (x_ind, x) in (-r..=r).enumerate() {
      grid[(y_ind, x_ind)] = level.bilinear(center + Vector2d::new(x as f64, y as f64));
    }
  }
}

// Scharr weights for the x derivative, divided by 32 to get intensity per
// pixel. The y derivative uses the transpose.
const SCHARR: [[f64; 3]; 3] = [
  [-3., 0., 3.],
  [-10., 0., 10.],
  [-3., 0., 3.],
];

// Derivatives of the interior of `grid`, which must have one pixel of padding.
fn scharr(
  grid: &Matrixd,
  out_x: &mut Matrixd,
  out_y: &mut Matrixd,
) {
  let shape = (grid.nrows() - 2, grid.ncols() - 2);
  if out_x.shape() != shape { *out_x = Matrixd::zeros(shape.0, shape.1) }
  if out_y.shape() != shape { *out_y = Matrixd::zeros(shape.0, shape.1) }
  for y in 0..shape.0 {
    for x in 0..shape.1 {
      let mut dx = 0.;
      let mut dy = 0.;
      for (i, row) in SCHARR.iter().enumerate() {
        for (j, weight) in row.iter().enumerate() {
          dx += weight * grid[(y + i, x + j)];
          dy += weight * grid[(y + j, x + i)];
        }
      }
      out_x[(y, x)] = dx / 32.;
      out_y[(y, x)] = dy / 32.;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::synthetic::*;

  fn image_5x5(data: Vec<u8>) -> Image {
    Image { data, width: 5, height: 5 }
  }

  fn scharr_at_center(image: &Image) -> (Matrixd, Matrixd) {
    let mut grid = DMatrix::zeros(0, 0);
    let mut out_x = DMatrix::zeros(0, 0);
    let mut out_y = DMatrix::zeros(0, 0);
    fill_grid(image, Vector2d::new(2.0, 2.0), 2, &mut grid);
    scharr(&grid, &mut out_x, &mut out_y);
    (out_x, out_y)
  }

  #[test]
  fn test_scharr() {
    let (dx, dy) = scharr_at_center(&image_5x5(vec![7; 25]));
    assert_eq!(dx, DMatrix::zeros(3, 3));
    assert_eq!(dy, DMatrix::zeros(3, 3));

    // Vertical ramp, 2 intensity units per row.
    let (dx, dy) = scharr_at_center(&Image::from_fn(5, 5, |_, y| 2 * y as u8));
    assert_eq!(dx, DMatrix::zeros(3, 3));
    assert_eq!(dy, DMatrix::repeat(3, 3, 2.));

    let (dx, dy) = scharr_at_center(&Image::from_fn(5, 5, |x, y| (3 * x + y) as u8));
    assert_eq!(dx, DMatrix::repeat(3, 3, 3.));
    assert_eq!(dy, DMatrix::repeat(3, 3, 1.));

    // Horizontal line through the middle row.
    let (dx, dy) = scharr_at_center(&Image::from_fn(5, 5, |_, y| if y == 2 { 16 } else { 0 }));
    assert_eq!(dx, DMatrix::zeros(3, 3));
    assert_eq!(dy, DMatrix::from_row_slice(3, 3, &[
      8., 8., 8.,
      0., 0., 0.,
      -8., -8., -8.,
    ]));
  }

  #[test]
  fn test_mean_absolute() {
    assert_eq!(mean_absolute(&DMatrix::from_row_slice(2, 2, &[1., -3., 0., 4.])), 2.);
    assert_eq!(mean_absolute(&DMatrix::zeros(0, 0)), 0.);
  }

  #[test]
  fn test_min_eigenvalue() {
    assert_eq!(min_eigenvalue(&Matrix2d::new(4., 0., 0., 1.)), 1.);
    assert!(min_eigenvalue(&Matrix2d::new(1., 1., 1., 1.)).abs() < 1e-12);
  }

  fn track(
    image0: &Image,
    image1: &Image,
    features0: &[Vector2d],
  ) -> (Vec<Vector2d>, Vec<bool>) {
    let p = ParameterSet::default();
    let mut optical_flow = OpticalFlow::new(&p).unwrap();
    let frame0 = Frame::new(image0, None, p.lk_levels);
    let frame1 = Frame::new(image1, None, p.lk_levels);
    let mut features1 = vec![];
    let mut statuses = vec![];
    optical_flow.process(&frame0, &frame1, features0, &mut features1, &mut statuses);
    assert_eq!(features1.len(), features0.len());
    assert_eq!(statuses.len(), features0.len());
    (features1, statuses)
  }

  #[test]
  fn test_zero_motion() {
    let image = blob_texture(120, 90, Vector2d::zeros(), 1);
    let features0 = vec![Vector2d::new(40., 40.), Vector2d::new(70.5, 30.25)];
    let (features1, statuses) = track(&image, &image, &features0);
    for i in 0..features0.len() {
      if !statuses[i] { continue }
      assert!((features1[i] - features0[i]).norm() < 1e-9);
    }
    assert!(statuses.iter().any(|s| *s));
  }

  #[test]
  fn test_known_shift() {
    let shift = Vector2d::new(3., -2.);
    let image0 = blob_texture(160, 120, Vector2d::zeros(), 2);
    let image1 = blob_texture(160, 120, shift, 2);
    let features0: Vec<Vector2d> = (0..6)
      .flat_map(|i| (0..4).map(move |j| Vector2d::new(30. + 20. * i as f64, 30. + 20. * j as f64)))
      .collect();
    let (features1, statuses) = track(&image0, &image1, &features0);
    let mut tracked = 0;
    let mut correct = 0;
    for i in 0..features0.len() {
      if !statuses[i] { continue }
      tracked += 1;
      let d = features1[i] - features0[i];
      if (d - shift).norm() < 0.5 { correct += 1 }
    }
    assert!(tracked > features0.len() / 2);
    assert!(correct * 10 >= tracked * 9, "{} of {} close to the true shift", correct, tracked);
  }

  #[test]
  fn test_flat_window_fails() {
    let image = Image::from_fn(60, 60, |_, _| 100);
    let (features1, statuses) = track(&image, &image, &[Vector2d::new(30., 30.)]);
    assert_eq!(statuses, vec![false]);
    assert_eq!(features1, vec![Vector2d::new(30., 30.)]);
  }

  #[test]
  fn test_textureless_target_fails() {
    // Windows are textured in the first image, but nothing matches them in
    // the second.
    let image0 = blob_texture(160, 120, Vector2d::zeros(), 4);
    let image1 = Image::from_fn(160, 120, |_, _| 0);
    let features0: Vec<Vector2d> = (0..5)
      .flat_map(|i| (0..3).map(move |j| Vector2d::new(40. + 20. * i as f64, 40. + 20. * j as f64)))
      .collect();
    let (features1, statuses) = track(&image0, &image1, &features0);
    assert!(statuses.iter().all(|s| !*s), "{:?}", statuses);
    assert_eq!(features1, features0);
  }

  #[test]
  fn test_empty_input() {
    let image = blob_texture(40, 40, Vector2d::zeros(), 3);
    let (features1, statuses) = track(&image, &image, &[]);
    assert!(features1.is_empty());
    assert!(statuses.is_empty());
  }
}
