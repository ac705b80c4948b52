use crate::all::*;

// One device motion event. Either acceleration may be missing depending on
// what the sensor reports.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSample {
  // Seconds.
  pub time: f64,
  // Gravity compensated, m/s².
  pub acceleration: Option<Vector3d>,
  // Raw accelerometer reading including gravity, m/s².
  pub acceleration_including_gravity: Option<Vector3d>,
}

// Naive double integration of the x-axis acceleration. Each sample adds
// `0.5 * a * dt²`, as if starting from zero velocity, so there is no velocity
// state and no gravity removal.
pub struct InertialIntegrator {
  // Meters, signed.
  displacement: f64,
  last_time: Option<f64>,
  last_acceleration: Option<Vector3d>,
}

impl InertialIntegrator {
  pub fn new() -> InertialIntegrator {
    InertialIntegrator {
      displacement: 0.,
      last_time: None,
      last_acceleration: None,
    }
  }

  pub fn process(&mut self, sample: &MotionSample) {
    // Gravity included values are biased, but better than nothing.
    let a = match (sample.acceleration, sample.acceleration_including_gravity) {
      (Some(a), _) => a,
      (None, Some(a)) => a,
      (None, None) => {
        warn!("Ignoring motion sample without acceleration.");
        return;
      },
    };

    let last_time = match self.last_time {
      Some(last_time) => last_time,
      None => {
        debug!("First motion sample at {:.3}s, no time step yet.", sample.time);
        self.last_time = Some(sample.time);
        self.last_acceleration = Some(a);
        return;
      },
    };
    let dt = sample.time - last_time;
    if dt < 0. || !dt.is_finite() {
      warn!("Ignoring unordered motion sample ({:.3}s after {:.3}s).", sample.time, last_time);
      return;
    }
    self.last_time = Some(sample.time);
    self.last_acceleration = Some(a);
    self.displacement += 0.5 * a[0] * dt * dt;
  }

  pub fn displacement(&self) -> f64 {
    self.displacement
  }

  pub fn last_acceleration(&self) -> Option<Vector3d> {
    self.last_acceleration
  }
}
