use crate::all::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
  // No previous frame yet.
  Uninitialized,
  Tracking,
}

// Published once per tracked video frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FusionEstimate {
  // Seconds, if the frame source reports capture times.
  pub time: Option<f64>,
  // Meters.
  pub fused_displacement: f64,
  pub flow_displacement: f64,
  pub accel_displacement: f64,
  // Average pixel displacement of the tracked features.
  pub pixel_flow: [f64; 2],
  pub tracked_points: usize,
  pub attempted_points: usize,
  pub last_acceleration: Option<[f64; 3]>,
}

pub struct FusionLoop {
  tracker: FeatureTracker,
  integrator: InertialIntegrator,
  filter: ComplementaryFilter,
  pixel_to_meter: f64,
  // Meters.
  flow_displacement: f64,
  estimate: Option<FusionEstimate>,
  // Grayscale conversion target, reused every cycle.
  gray: Image,
}

impl FusionLoop {
  pub fn new(p: &ParameterSet) -> Result<FusionLoop> {
    p.validate()?;
    Ok(FusionLoop {
      tracker: FeatureTracker::new(p)?,
      integrator: InertialIntegrator::new(),
      filter: ComplementaryFilter::new(p),
      pixel_to_meter: p.pixel_to_meter,
      flow_displacement: 0.,
      estimate: None,
      gray: Image::empty(),
    })
  }

  pub fn process_motion(&mut self, sample: &MotionSample) {
    self.integrator.process(sample);
  }

  pub fn process_frame(
    &mut self,
    video_frame: &VideoFrame,
    time: Option<f64>,
  ) -> Result<Option<FusionEstimate>> {
    let mut gray = mem::take(&mut self.gray);
    video_frame.to_grayscale(&mut gray);
    let result = self.process_image(&gray, time);
    self.gray = gray;
    result
  }

  // Runs one cycle on an already grayscale image. Returns the new estimate,
  // or `None` for the frame that initializes tracking.
  pub fn process_image(&mut self, image: &Image, time: Option<f64>) -> Result<Option<FusionEstimate>> {
    match self.state() {
      LoopState::Uninitialized => {
        self.tracker.initialize(image)?;
        info!("Tracking initialized with {} features.", self.tracker.points().len());
        Ok(None)
      },
      LoopState::Tracking => {
        let pixel_flow = self.tracker.track(image)?;
        self.flow_displacement = pixel_flow.norm() * self.pixel_to_meter;
        let accel_displacement = self.integrator.displacement();
        let estimate = FusionEstimate {
          time,
          fused_displacement: self.filter.fuse(accel_displacement, self.flow_displacement),
          flow_displacement: self.flow_displacement,
          accel_displacement,
          pixel_flow: [pixel_flow[0], pixel_flow[1]],
          tracked_points: self.tracker.tracked_count(),
          attempted_points: self.tracker.attempted_count(),
          last_acceleration: self.integrator.last_acceleration().map(|a| [a[0], a[1], a[2]]),
        };
        debug!(
          "Fused displacement {:.4} m (accel {:.4} m, flow {:.4} m).",
          estimate.fused_displacement,
          estimate.accel_displacement,
          estimate.flow_displacement,
        );
        self.estimate = Some(estimate.clone());
        Ok(Some(estimate))
      },
    }
  }

  // The tracker holds the previous frame once tracking has started.
  pub fn state(&self) -> LoopState {
    if self.tracker.is_initialized() { LoopState::Tracking } else { LoopState::Uninitialized }
  }

  pub fn estimate(&self) -> Option<&FusionEstimate> {
    self.estimate.as_ref()
  }

  pub fn tracker(&self) -> &FeatureTracker {
    &self.tracker
  }
}
