use crate::all::*;

use std::process::{Child, ChildStdout, Command, Stdio};

// Interleaved 8-bit RGB camera frame.
pub struct VideoFrame {
  pub data: Vec<u8>,
  pub width: usize,
  pub height: usize,
}

impl VideoFrame {
  // ITU-R BT.601 luma, written into `out` to reuse its buffer.
  pub fn to_grayscale(&self, out: &mut Image) {
    out.width = self.width;
    out.height = self.height;
    out.data.clear();
    out.data.extend(self.data.chunks_exact(3).map(|rgb| {
      let y = 299 * rgb[0] as u32 + 587 * rgb[1] as u32 + 114 * rgb[2] as u32;
      ((y + 500) / 1000) as u8
    }));
  }
}

pub trait FrameSource {
  // End of video is signaled by `Ok(None)`.
  fn read(&mut self) -> Result<Option<&VideoFrame>>;

  fn size(&self) -> (usize, usize);
}

// Decodes a video file into raw frames by piping it through `ffmpeg`.
pub struct VideoInput {
  child: Child,
  child_stdout: ChildStdout,
  video_frame: VideoFrame,
}

impl VideoInput {
  pub fn new(path: &Path) -> Result<VideoInput> {
    if !path.exists() {
      bail!("Video file {} does not exist.", path.display());
    }
    let path = path.to_str().ok_or(anyhow!("Failed to parse video path."))?;
    let (width, height) = probe_dimensions(path)?;
    info!("Video {} is {}x{}.", path, width, height);
    let mut child = Command::new("ffmpeg")
      .args(["-loglevel", "error", "-i", path])
      .args(["-f", "rawvideo", "-vcodec", "rawvideo", "-vsync", "vfr", "-pix_fmt", "rgb24", "-"])
      .stdout(Stdio::piped())
      .spawn()
      .context("Failed to start ffmpeg.")?;
    let child_stdout = child.stdout.take()
      .ok_or(anyhow!("Failed to capture ffmpeg output."))?;
    Ok(VideoInput {
      child,
      child_stdout,
      video_frame: VideoFrame {
        data: vec![0; 3 * width * height],
        width,
        height,
      },
    })
  }
}

impl FrameSource for VideoInput {
  fn read(&mut self) -> Result<Option<&VideoFrame>> {
    match self.child_stdout.read_exact(&mut self.video_frame.data) {
      Ok(()) => Ok(Some(&self.video_frame)),
      Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
      Err(err) => Err(err).context("Reading bytes from video input failed."),
    }
  }

  fn size(&self) -> (usize, usize) {
    (self.video_frame.width, self.video_frame.height)
  }
}

impl Drop for VideoInput {
  fn drop(&mut self) {
    // The decoder may still be running if we stop early.
    let _ = self.child.kill();
    let _ = self.child.wait();
  }
}

fn probe_dimensions(path: &str) -> Result<(usize, usize)> {
  let output = Command::new("ffprobe")
    .args(["-v", "error", "-select_streams", "v:0"])
    .args(["-show_entries", "stream=width,height", "-of", "csv=p=0:s=x", path])
    .output()
    .context("Failed to run ffprobe.")?;
  if !output.status.success() {
    bail!("ffprobe failed for {}: {}", path, String::from_utf8_lossy(&output.stderr).trim());
  }
  parse_dimensions(&String::from_utf8_lossy(&output.stdout))
    .context(format!("Unexpected ffprobe output for {}.", path))
}

fn parse_dimensions(s: &str) -> Result<(usize, usize)> {
  let line = s.lines().next().ok_or(anyhow!("Empty dimensions."))?;
  let (w, h) = line.trim().split_once('x').ok_or(anyhow!("Malformed dimensions {}.", line))?;
  let width: usize = w.parse()?;
  let height: usize = h.parse()?;
  if width == 0 || height == 0 {
    bail!("Video has zero size.");
  }
  Ok((width, height))
}
