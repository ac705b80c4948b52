use crate::all::*;

// Gaussian kernel used before each 2x decimation.
const KERNEL: [u32; 5] = [1, 4, 6, 4, 1];

// Levels above the full resolution image. `levels[0]` is half resolution.
pub struct Pyramid {
  pub levels: Vec<Image>,
  // Row filtered intermediate, kept to avoid allocation.
  workspace: Vec<u32>,
}

impl Pyramid {
  pub fn new(
    image: &Image,
    unused_pyramid: Option<Pyramid>,
    level_count: usize,
  ) -> Pyramid {
    let mut pyramid = unused_pyramid.unwrap_or(Pyramid {
      levels: vec![],
      workspace: vec![],
    });
    pyramid.compute_levels(image, level_count);
    pyramid
  }

  fn compute_levels(&mut self, image: &Image, level_count: usize) {
    self.levels.resize_with(level_count, Image::empty);
    for level_ind in 0..level_count {
      // Split to borrow the parent non-mutably and the child mutably.
      let (parents, children) = self.levels.split_at_mut(level_ind);
      let parent = if level_ind > 0 { &parents[level_ind - 1] } else { image };
      downscale(parent, &mut children[0], &mut self.workspace);
    }
  }
}

fn downscale(parent: &Image, child: &mut Image, workspace: &mut Vec<u32>) {
  let w = parent.width;
  let h = parent.height;
  child.width = (w + 1) / 2;
  child.height = (h + 1) / 2;
  child.data.clear();
  if w == 0 || h == 0 { return }

  // Horizontal pass on the columns that survive decimation.
  workspace.clear();
  workspace.resize(child.width * h, 0);
  for y in 0..h {
    for cx in 0..child.width {
      let x = 2 * cx as i32;
      let mut sum = 0;
      for (k, weight) in KERNEL.iter().enumerate() {
        sum += weight * parent.value_clamped(x + k as i32 - 2, y as i32) as u32;
      }
      workspace[y * child.width + cx] = sum;
    }
  }

  // Vertical pass on the surviving rows.
  child.data.reserve(child.width * child.height);
  for cy in 0..child.height {
    let y = 2 * cy as i32;
    for cx in 0..child.width {
      let mut sum = 0;
      for (k, weight) in KERNEL.iter().enumerate() {
        let yk = (y + k as i32 - 2).clamp(0, h as i32 - 1) as usize;
        sum += weight * workspace[yk * child.width + cx];
      }
      // Kernel weights sum to 16 in each direction. Round to nearest.
      child.data.push(((sum + 128) / 256) as u8);
    }
  }
}
