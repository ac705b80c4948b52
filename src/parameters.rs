use crate::all::*;

lazy_static! {
  pub static ref PARAMETER_SET: Mutex<ParameterSet> = Mutex::new(ParameterSet::default());
}

#[derive(Clone, Debug)]
#[derive(clap::Parser)]
pub struct ParameterSet {
  // Process only every Nth video frame.
  #[clap(long, default_value = "1")]
  pub frame_sub: usize,

  // Corner detector.
  #[clap(long, default_value = "100")]
  pub max_corners: usize,
  // Relative to the strongest corner response in the image.
  #[clap(long, default_value = "0.3")]
  pub quality_level: f64,
  // Pixels.
  #[clap(long, default_value = "7")]
  pub min_distance: f64,
  #[clap(long, default_value = "7")]
  pub block_size: usize,

  // Pyramidal Lucas-Kanade feature tracker. `lk_levels` counts the levels
  // above the full resolution image.
  #[clap(long, default_value = "2")]
  pub lk_levels: usize,
  #[clap(long, default_value = "10")]
  pub lk_iters: usize,
  #[clap(long, default_value = "0.03")]
  pub lk_epsilon: f64,
  #[clap(long, default_value = "15")]
  pub lk_win_size: usize,
  // Per window pixel, in squared intensity gradient units.
  #[clap(long, default_value = "0.0001")]
  pub lk_min_eigenvalue: f64,
  // Mean absolute intensity difference between the matched windows.
  #[clap(long, default_value = "12")]
  pub lk_max_residual: f64,

  // Meters per pixel of image motion.
  #[clap(long, default_value = "0.001")]
  pub pixel_to_meter: f64,
  // Weight of the inertial displacement in the fused estimate.
  #[clap(long, default_value = "0.6")]
  pub alpha: f64,

  // Visualizations.
  #[clap(long)]
  pub show_features: bool,
  #[clap(long)]
  pub show_flow: bool,
  #[clap(long)]
  pub show_pyramid: bool,
}

impl Default for ParameterSet {
  fn default() -> ParameterSet {
    // Use the command line defaults so there is only one place to change them.
    <ParameterSet as clap::Parser>::parse_from(["flowfuse"])
  }
}

impl ParameterSet {
  pub fn validate(&self) -> Result<()> {
    if self.frame_sub == 0 {
      bail!("Frame subsampling must be at least 1.");
    }
    if self.max_corners == 0 {
      bail!("Maximum corner count must be positive.");
    }
    if !(self.quality_level > 0. && self.quality_level <= 1.) {
      bail!("Corner quality level must be in (0, 1], got {}.", self.quality_level);
    }
    if self.min_distance < 0. {
      bail!("Minimum corner distance cannot be negative.");
    }
    if self.block_size % 2 != 1 || self.block_size < 3 {
      bail!("Corner block size must be an odd number of at least 3.");
    }
    if self.lk_win_size % 2 != 1 {
      bail!("Lucas-Kanade window size must be odd number.");
    }
    if self.lk_win_size < 3 {
      bail!("Lucas-Kanade window size must be at least 3.");
    }
    if self.lk_iters == 0 {
      bail!("Lucas-Kanade needs at least one iteration.");
    }
    if !(self.lk_max_residual > 0.) {
      bail!("Lucas-Kanade residual threshold must be positive.");
    }
    if !(self.pixel_to_meter > 0.) {
      bail!("Pixel to meter factor must be positive.");
    }
    if !(0. ..=1.).contains(&self.alpha) {
      bail!("Complementary filter alpha must be in [0, 1], got {}.", self.alpha);
    }
    Ok(())
  }
}
