use crate::all::*;

use softbuffer::GraphicsContext;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::ControlFlow;
use winit::window::Window;

pub enum Step {
  // First frame, tracking started.
  Initialized,
  Estimate(FusionEstimate),
  // Frame dropped by subsampling.
  Skipped,
  End,
}

// Feeds motion samples and video frames to the fusion loop in recorded order.
pub struct Session {
  pub fusion: FusionLoop,
  input: Option<Input>,
  video: Box<dyn FrameSource>,
  frame_sub: usize,
  frame_number: usize,
}

impl Session {
  pub fn new(
    p: &ParameterSet,
    input: Option<Input>,
    video: Box<dyn FrameSource>,
  ) -> Result<Session> {
    let mut session = Session {
      fusion: FusionLoop::new(p)?,
      input,
      video,
      frame_sub: p.frame_sub,
      frame_number: 0,
    };
    // Process the first frame now so that unusable sources fail at startup.
    match session.step().context("Failed to process the first video frame.")? {
      Step::Initialized => Ok(session),
      _ => bail!("No video frame available."),
    }
  }

  // Handles all motion samples up to and including the next video frame.
  pub fn step(&mut self) -> Result<Step> {
    let time = match self.input.as_mut() {
      Some(input) => loop {
        match input.next()? {
          Some(InputData::Motion(sample)) => self.fusion.process_motion(&sample),
          Some(InputData::Frame { time }) => break Some(time),
          None => return Ok(Step::End),
        }
      },
      // Without recorded timing, frames follow each other directly.
      None => None,
    };
    let video_frame = match self.video.read()? {
      Some(video_frame) => video_frame,
      None => return Ok(Step::End),
    };
    let frame_number = self.frame_number;
    self.frame_number += 1;
    if frame_number % self.frame_sub != 0 {
      return Ok(Step::Skipped);
    }
    Ok(match self.fusion.process_frame(video_frame, time)? {
      Some(estimate) => Step::Estimate(estimate),
      None => Step::Initialized,
    })
  }
}

pub fn run_headless(session: &mut Session) -> Result<()> {
  use std::io::Write;
  let stdout = std::io::stdout();
  let mut stdout = stdout.lock();
  loop {
    match session.step()? {
      Step::Estimate(estimate) => {
        serde_json::to_writer(&mut stdout, &estimate)?;
        writeln!(stdout)?;
      },
      Step::Initialized | Step::Skipped => {},
      Step::End => break,
    }
  }
  if let Some(estimate) = session.fusion.estimate() {
    info!("Final fused displacement {:.4} m.", estimate.fused_displacement);
  }
  Ok(())
}

pub struct EventLoopArgs<'a> {
  pub session: &'a mut Session,
  pub buffer: &'a mut Vec<u32>,
  pub graphics_context: &'a mut GraphicsContext<Window>,
  pub video_w: usize,
  pub video_h: usize,
  pub finished: bool,
}

pub fn handle_event(
  event: Event<()>,
  control_flow: &mut ControlFlow,
  args: &mut EventLoopArgs,
) -> Result<()> {
  let (window_width, window_height) = {
    let size = args.graphics_context.window().inner_size();
    (size.width as usize, size.height as usize)
  };
  if args.buffer.len() != window_width * window_height {
    *args.buffer = vec![0; window_width * window_height];
  }

  match event {
    Event::RedrawRequested(window_id) if window_id == args.graphics_context.window().id() => {
      args.graphics_context.set_buffer(&args.buffer, window_width as u16, window_height as u16);
    },
    Event::WindowEvent {
      event,
      window_id,
    } => {
      if event == WindowEvent::CloseRequested && window_id == args.graphics_context.window().id() {
        *control_flow = ControlFlow::Exit;
      }
      match event {
        WindowEvent::KeyboardInput {
          input: KeyboardInput {
            state: ElementState::Pressed,
            virtual_keycode: Some(keycode),
            scancode: _,
            ..
          },
          is_synthetic: _,
          device_id: _,
        } => {
          match keycode {
            VirtualKeyCode::Escape | VirtualKeyCode::Q => {
              *control_flow = ControlFlow::Exit;
            },
            _ => {}, // Other keys.
          }
        },
        _ => {}, // Other window events.
      }
    },
    // One fusion cycle per display refresh.
    Event::MainEventsCleared if !args.finished => {
      match args.session.step()? {
        Step::Estimate(estimate) => {
          info!(
            "Fused displacement {:.4} m, {}/{} points tracked.",
            estimate.fused_displacement,
            estimate.tracked_points,
            estimate.attempted_points,
          );
        },
        Step::Initialized | Step::Skipped => {},
        Step::End => {
          info!("End of input, press Q to quit.");
          args.finished = true;
        },
      }
      let mut visualize_args = VisualizeArgs {
        buffer: &mut *args.buffer,
        video_w: args.video_w,
        video_h: args.video_h,
        buffer_w: window_width,
        buffer_h: window_height,
      };
      visualize(&mut visualize_args, &args.session.fusion)?;
      args.graphics_context.window().request_redraw();
    },
    _ => {}, // Other events.
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::synthetic::*;

  // Frames held in memory.
  struct MemoryVideo {
    frames: Vec<VideoFrame>,
    next: usize,
  }

  impl FrameSource for MemoryVideo {
    fn read(&mut self) -> Result<Option<&VideoFrame>> {
      self.next += 1;
      Ok(self.frames.get(self.next - 1))
    }

    fn size(&self) -> (usize, usize) {
      (160, 120)
    }
  }

  fn video(shifts: &[f64]) -> Box<dyn FrameSource> {
    let frames = shifts.iter().map(|shift| {
      let image = blob_texture(160, 120, Vector2d::new(*shift, 0.), 9);
      VideoFrame {
        data: image.data.iter().flat_map(|v| [*v, *v, *v]).collect(),
        width: image.width,
        height: image.height,
      }
    }).collect();
    Box::new(MemoryVideo { frames, next: 0 })
  }

  fn input(s: &'static str) -> Option<Input> {
    Some(Input::from_reader(std::io::Cursor::new(s)))
  }

  #[test]
  fn test_replay() {
    let mut session = Session::new(
      &ParameterSet::default(),
      input(r#"
{"time": 0.0, "sensor": {"type": "linearAcceleration", "values": [2, 0, 0]}}
{"time": 0.0, "frames": [{"number": 0}]}
{"time": 1.0, "sensor": {"type": "linearAcceleration", "values": [2, 0, 0]}}
{"time": 1.0, "frames": [{"number": 1}]}
"#),
      video(&[0., 0.]),
    ).unwrap();
    match session.step().unwrap() {
      Step::Estimate(estimate) => {
        assert_eq!(estimate.time, Some(1.0));
        assert_eq!(estimate.accel_displacement, 1.0);
        assert!((estimate.fused_displacement - 0.6).abs() < 1e-9);
      },
      _ => panic!("Expected an estimate."),
    }
    assert!(matches!(session.step().unwrap(), Step::End));
  }

  #[test]
  fn test_video_only() {
    let mut session = Session::new(&ParameterSet::default(), None, video(&[0., 1., 2.])).unwrap();
    assert_eq!(session.fusion.state(), LoopState::Tracking);
    for _ in 0..2 {
      match session.step().unwrap() {
        Step::Estimate(estimate) => {
          assert_eq!(estimate.time, None);
          assert_eq!(estimate.accel_displacement, 0.);
          assert!(estimate.pixel_flow[0] > 0.5);
        },
        _ => panic!("Expected an estimate."),
      }
    }
    assert!(matches!(session.step().unwrap(), Step::End));
  }

  #[test]
  fn test_no_first_frame() {
    assert!(Session::new(&ParameterSet::default(), None, video(&[])).is_err());
    // Motion samples but no frame timing.
    let samples = input(r#"{"time": 0.0, "sensor": {"type": "linearAcceleration", "values": [2, 0, 0]}}"#);
    assert!(Session::new(&ParameterSet::default(), samples, video(&[0.])).is_err());
    let empty_video = Box::new(MemoryVideo {
      frames: vec![VideoFrame { data: vec![], width: 0, height: 0 }],
      next: 0,
    });
    assert!(Session::new(&ParameterSet::default(), None, empty_video).is_err());
  }

  #[test]
  fn test_frame_subsampling() {
    let mut p = ParameterSet::default();
    p.frame_sub = 2;
    let mut session = Session::new(&p, None, video(&[0., 1., 2., 3.])).unwrap();
    assert!(matches!(session.step().unwrap(), Step::Skipped));
    match session.step().unwrap() {
      Step::Estimate(estimate) => assert!((estimate.pixel_flow[0] - 2.).abs() < 0.3),
      _ => panic!("Expected an estimate."),
    }
    assert!(matches!(session.step().unwrap(), Step::Skipped));
    assert!(matches!(session.step().unwrap(), Step::End));
  }
}
