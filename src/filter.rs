use crate::all::*;

// Fixed weight blend of the drifting inertial displacement and the noisy
// visual displacement.
#[derive(Clone, Copy, Debug)]
pub struct ComplementaryFilter {
  alpha: f64,
}

impl ComplementaryFilter {
  pub fn new(p: &ParameterSet) -> ComplementaryFilter {
    ComplementaryFilter {
      alpha: p.alpha,
    }
  }

  pub fn fuse(&self, accel_displacement: f64, flow_displacement: f64) -> f64 {
    self.alpha * accel_displacement + (1. - self.alpha) * flow_displacement
  }
}
