// NOTE This kind of import-all file isn't a common Rust idiom.

pub use crate::{
  detector::*,
  event_loop::*,
  filter::*,
  frame::*,
  fusion_loop::*,
  image::*,
  inertial::*,
  input::*,
  optical_flow::*,
  parameters::*,
  pyramid::*,
  tracker::*,
  types::*,
  video::*,
  visualize::*,
};

pub use {
  std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    mem,
    path::Path,
    sync::Mutex,
  },
  log::{debug, info, warn, LevelFilter},
  nalgebra::DMatrix,
  anyhow::{anyhow, bail, Context as AnyhowContext, Result},
  serde::Serialize,
};
