use crate::all::*;

// Previous grayscale frame and the points detected in it.
struct TrackerState {
  frame: Frame,
  points: Vec<Vector2d>,
}

pub struct FeatureTracker {
  detector: Detector,
  optical_flow: OpticalFlow,
  lk_levels: usize,
  state: Option<TrackerState>,
  // Frame of the cycle before last, reused for its buffers.
  unused_frame: Option<Frame>,
  // Pixels, average over successfully tracked points of the last `track()`
  // call that had any.
  displacement: Vector2d,
  tmp: Tmp,
}

// Per cycle buffers, overwritten by every `track()` call.
#[derive(Default)]
struct Tmp {
  previous_points: Vec<Vector2d>,
  next_points: Vec<Vector2d>,
  statuses: Vec<bool>,
}

impl FeatureTracker {
  pub fn new(p: &ParameterSet) -> Result<FeatureTracker> {
    Ok(FeatureTracker {
      detector: Detector::new(p),
      optical_flow: OpticalFlow::new(p)?,
      lk_levels: p.lk_levels,
      state: None,
      unused_frame: None,
      displacement: Vector2d::zeros(),
      tmp: Tmp::default(),
    })
  }

  pub fn is_initialized(&self) -> bool {
    self.state.is_some()
  }

  pub fn initialize(&mut self, image: &Image) -> Result<()> {
    if self.state.is_some() {
      bail!("Feature tracker is already initialized.");
    }
    if image.is_empty() {
      bail!("Cannot initialize feature tracking from an empty image.");
    }
    let mut points = vec![];
    self.detector.process(image, &mut points);
    if points.is_empty() {
      warn!("No corners detected in the initial frame.");
    }
    self.state = Some(TrackerState {
      frame: Frame::new(image, None, self.lk_levels),
      points,
    });
    Ok(())
  }

  // Returns the average pixel displacement of the tracked points, or the
  // previous displacement if no point could be tracked.
  pub fn track(&mut self, image: &Image) -> Result<Vector2d> {
    if image.is_empty() {
      bail!("Cannot track features into an empty image.");
    }
    let TrackerState { frame: previous_frame, points: mut previous_points } = self.state.take()
      .ok_or(anyhow!("Feature tracker must be initialized before tracking."))?;
    let frame = Frame::new(image, self.unused_frame.take(), self.lk_levels);
    self.optical_flow.process(
      &previous_frame,
      &frame,
      &previous_points,
      &mut self.tmp.next_points,
      &mut self.tmp.statuses,
    );

    match average_displacement(&previous_points, &self.tmp.next_points, &self.tmp.statuses) {
      Some(d) => self.displacement = d,
      None => warn!(
        "None of {} points tracked, keeping previous displacement.",
        previous_points.len(),
      ),
    }
    debug!(
      "Tracked {}/{} points, displacement ({:.3}, {:.3}) px.",
      self.tracked_count(),
      self.attempted_count(),
      self.displacement[0],
      self.displacement[1],
    );

    // Keep the tracked points for `flow()` and recycle the older buffer.
    mem::swap(&mut self.tmp.previous_points, &mut previous_points);
    // Re-seed from scratch rather than replenishing lost tracks.
    self.detector.process(image, &mut previous_points);
    self.state = Some(TrackerState { frame, points: previous_points });
    self.unused_frame = Some(previous_frame);
    Ok(self.displacement)
  }

  #[cfg(test)]
  pub fn displacement(&self) -> Vector2d {
    self.displacement
  }

  // Diagnostics of the last `track()` call.
  pub fn tracked_count(&self) -> usize {
    self.tmp.statuses.iter().filter(|s| **s).count()
  }

  pub fn attempted_count(&self) -> usize {
    self.tmp.statuses.len()
  }

  // Successfully tracked point pairs of the last `track()` call.
  pub fn flow(&self) -> impl Iterator<Item = (Vector2d, Vector2d)> + '_ {
    self.tmp.previous_points.iter()
      .zip(self.tmp.next_points.iter())
      .zip(self.tmp.statuses.iter())
      .filter(|(_, status)| **status)
      .map(|((p0, p1), _)| (*p0, *p1))
  }

  // Points that the next `track()` call will attempt to track.
  pub fn points(&self) -> &[Vector2d] {
    match &self.state {
      Some(state) => state.points.as_slice(),
      None => &[],
    }
  }

  pub fn frame(&self) -> Option<&Frame> {
    self.state.as_ref().map(|state| &state.frame)
  }
}

pub fn average_displacement(
  previous_points: &[Vector2d],
  next_points: &[Vector2d],
  statuses: &[bool],
) -> Option<Vector2d> {
  assert_eq!(previous_points.len(), next_points.len());
  assert_eq!(previous_points.len(), statuses.len());
  let mut sum = Vector2d::zeros();
  let mut n = 0;
  for i in 0..statuses.len() {
    if !statuses[i] { continue }
    sum += next_points[i] - previous_points[i];
    n += 1;
  }
  if n == 0 { return None }
  Some(sum / n as f64)
}
