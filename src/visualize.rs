use crate::all::*;

pub struct VisualizeArgs<'a> {
  pub buffer: &'a mut Vec<u32>,
  pub video_w: usize,
  pub video_h: usize,
  pub buffer_w: usize,
  pub buffer_h: usize,
}

const GREEN: u32 = 255 << 8;
const YELLOW: u32 = (255 << 16) | (255 << 8);

#[inline(always)]
fn draw_pixel(args: &mut VisualizeArgs, p: &Vector2i, v: u32) {
  if p[0] < 0 || p[0] >= args.buffer_w as i32 { return }
  if p[1] < 0 || p[1] >= args.buffer_h as i32 { return }
  args.buffer[p[1] as usize * args.buffer_w + p[0] as usize] = v;
}

fn draw_square(args: &mut VisualizeArgs, p: &Vector2i, v: u32, r: i32) {
  for z in (-r)..(r+1) {
    draw_pixel(args, &(p + Vector2i::new(z, -r)), v);
    draw_pixel(args, &(p + Vector2i::new(z, r)), v);
    draw_pixel(args, &(p + Vector2i::new(-r, z)), v);
    draw_pixel(args, &(p + Vector2i::new(r, z)), v);
  }
}

fn draw_line(args: &mut VisualizeArgs, mut p0: Vector2i, mut p1: Vector2i, v: u32) {
  let dx = p1[0] - p0[0];
  let dy = p1[1] - p0[1];
  if dx == 0 && dy == 0 {
    draw_pixel(args, &p0, v);
  }
  else if dx.abs() < dy.abs() {
    if p0[1] > p1[1] { (p0, p1) = (p1, p0); }
    let k = dx as f32 / dy as f32;
    for y in p0[1] ..= p1[1] {
      let x = p0[0] + (k * (y - p0[1]) as f32).round() as i32;
      draw_pixel(args, &Vector2i::new(x, y), v);
    }
  }
  else {
    if p0[0] > p1[0] { (p0, p1) = (p1, p0); }
    let k = dy as f32 / dx as f32;
    for x in p0[0] ..= p1[0] {
      let y = p0[1] + (k * (x - p0[0]) as f32).round() as i32;
      draw_pixel(args, &Vector2i::new(x, y), v);
    }
  }
}

fn draw_buffer(
  args: &mut VisualizeArgs,
  image: &Image,
  // Top-left coordinates of drawing target.
  ax: usize,
  ay: usize,
) {
  let w = image.width;
  let h = image.height;
  for y in 0..h {
    if y + ay >= args.buffer_h { continue }
    for x in 0..w {
      if x + ax >= args.buffer_w { continue }
      let gray = image.value(x, y) as u32;
      args.buffer[(y + ay) * args.buffer_w + x + ax] = gray | (gray << 8) | (gray << 16);
    }
  }
}

pub fn visualize(args: &mut VisualizeArgs, fusion: &FusionLoop) -> Result<()> {
  args.buffer.iter_mut().for_each(|v| *v = 0);

  let tracker = fusion.tracker();
  let frame = match tracker.frame() {
    Some(frame) => frame,
    // Nothing processed yet.
    None => return Ok(()),
  };
  if frame.image.width != args.video_w || frame.image.height != args.video_h {
    bail!(
      "Frame size {}x{} does not match the video size {}x{}.",
      frame.image.width, frame.image.height, args.video_w, args.video_h,
    );
  }
  draw_buffer(args, &frame.image, 0, 0);

  let p = PARAMETER_SET.lock().unwrap();
  if p.show_pyramid {
    let ax = args.video_w;
    let mut ay = 0;
    for level in &frame.pyramid.levels {
      draw_buffer(args, level, ax, ay);
      ay += level.height;
    }
  }

  if p.show_features {
    for point in tracker.points() {
      draw_square(args, &from_f64(point), GREEN, 3);
    }
  }

  if p.show_flow {
    for (p0, p1) in tracker.flow() {
      draw_line(args, from_f64(&p0), from_f64(&p1), YELLOW);
      draw_square(args, &from_f64(&p1), YELLOW, 1);
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(buffer: &mut Vec<u32>, w: usize, h: usize) -> VisualizeArgs {
    VisualizeArgs {
      buffer,
      video_w: w,
      video_h: h,
      buffer_w: w,
      buffer_h: h,
    }
  }

  #[test]
  fn test_draw_line() {
    let mut buffer = vec![0; 25];
    let mut a = args(&mut buffer, 5, 5);
    draw_line(&mut a, Vector2i::new(4, 4), Vector2i::new(0, 0), 1);
    draw_line(&mut a, Vector2i::new(2, 2), Vector2i::new(2, 2), 2);
    // Clipped.
    draw_line(&mut a, Vector2i::new(-10, 0), Vector2i::new(10, 0), 3);
    assert_eq!(buffer, vec![
      3, 3, 3, 3, 3,
      0, 1, 0, 0, 0,
      0, 0, 2, 0, 0,
      0, 0, 0, 1, 0,
      0, 0, 0, 0, 1,
    ]);
  }

  #[test]
  fn test_before_first_frame() {
    let fusion = FusionLoop::new(&ParameterSet::default()).unwrap();
    let mut buffer = vec![7; 16];
    visualize(&mut args(&mut buffer, 4, 4), &fusion).unwrap();
    assert!(buffer.iter().all(|v| *v == 0));
  }

  #[test]
  fn test_draws_frame() {
    let mut fusion = FusionLoop::new(&ParameterSet::default()).unwrap();
    let image = Image::from_fn(4, 3, |x, y| (10 * x + y) as u8);
    fusion.process_image(&image, None).unwrap();
    let mut buffer = vec![0; 12];
    visualize(&mut args(&mut buffer, 4, 3), &fusion).unwrap();
    assert_eq!(buffer[0], 0);
    assert_eq!(buffer[4 + 3], 31 | (31 << 8) | (31 << 16));

    let mut buffer = vec![0; 12];
    assert!(visualize(&mut args(&mut buffer, 3, 4), &fusion).is_err());
  }
}
