mod all;
mod detector;
mod event_loop;
mod filter;
mod frame;
mod fusion_loop;
mod image;
mod inertial;
mod input;
mod optical_flow;
mod parameters;
mod pyramid;
#[cfg(test)]
mod synthetic;
mod tracker;
mod types;
mod util;
mod video;
mod visualize;

use all::*;

#[macro_use] extern crate lazy_static;
use clap::Parser;

use softbuffer::GraphicsContext;
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit::platform::run_return::EventLoopExtRunReturn;

#[derive(Parser)]
struct Args {
  // Recorded sensor events in JSONL format.
  #[clap(short, long)]
  input: Option<String>,
  video: String,
  // Write estimates to stdout as JSONL instead of opening a window.
  #[clap(long)]
  headless: bool,
  #[clap(long, default_value = "info")]
  log_level: String,
  #[clap(flatten)]
  parameters: ParameterSet,
}

fn handle_error(err: &anyhow::Error) {
  for (i, e) in err.chain().enumerate() {
    eprintln!("  {}: {}", i + 1, e);
  }
}

fn main() {
  if let Err(err) = run() {
    handle_error(&err);
    std::process::exit(1);
  }
}

fn run() -> Result<()> {
  let args = Args::parse();

  let log_level: LevelFilter = args.log_level.parse()
    .map_err(|_| anyhow!("Unknown log level {}.", args.log_level))?;
  env_logger::Builder::new()
    .filter_level(log_level)
    .format(util::format_log)
    .init();

  args.parameters.validate()?;
  *PARAMETER_SET.lock().unwrap() = args.parameters.clone();

  let input = match &args.input {
    Some(path) => Some(Input::new(Path::new(path))?),
    None => None,
  };
  let video = VideoInput::new(Path::new(&args.video))?;
  let (video_w, video_h) = video.size();
  let mut session = Session::new(&args.parameters, input, Box::new(video))?;

  if args.headless {
    return run_headless(&mut session);
  }

  // Coarser pyramid levels are stacked to the right of the frame.
  let width = if args.parameters.show_pyramid { video_w + (video_w + 1) / 2 } else { video_w };
  let size = winit::dpi::PhysicalSize::new(width as u32, video_h as u32);
  let mut event_loop = EventLoop::new();
  let window = WindowBuilder::new()
    .with_title("flowfuse")
    .with_resizable(false)
    .with_min_inner_size(size)
    .with_max_inner_size(size)
    .build(&event_loop)
    .context("Failed to create window.")?;
  let mut graphics_context = unsafe { GraphicsContext::new(window) }
    .map_err(|err| anyhow!("Failed to create graphics context: {:?}", err))?;

  let mut buffer = vec![];
  let mut args = EventLoopArgs {
    session: &mut session,
    buffer: &mut buffer,
    graphics_context: &mut graphics_context,
    video_w,
    video_h,
    finished: false,
  };

  event_loop.run_return(move |event, _, control_flow| {
    if let Err(err) = handle_event(event, control_flow, &mut args) {
      handle_error(&err);
      *control_flow = ControlFlow::Exit;
    }
  });
  Ok(())
}
