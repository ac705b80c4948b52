use crate::all::*;

// Grayscale image and its pyramid, as needed by the feature tracker.
pub struct Frame {
  pub image: Image,
  pub pyramid: Pyramid,
}

impl Frame {
  // Copies `image` into the buffers of `unused_frame` if given, to avoid
  // allocating new ones every cycle.
  pub fn new(
    image: &Image,
    unused_frame: Option<Frame>,
    level_count: usize,
  ) -> Frame {
    let (image, unused_pyramid) = if let Some(mut unused_frame) = unused_frame {
      unused_frame.image.data.clear();
      unused_frame.image.data.extend_from_slice(&image.data);
      unused_frame.image.width = image.width;
      unused_frame.image.height = image.height;
      (unused_frame.image, Some(unused_frame.pyramid))
    }
    else {
      (image.clone(), None)
    };
    Frame {
      pyramid: Pyramid::new(&image, unused_pyramid, level_count),
      image,
    }
  }

  pub fn level_count(&self) -> usize {
    self.pyramid.levels.len() + 1
  }

  pub fn get_level(&self, level: usize) -> &Image {
    if level == 0 { &self.image } else { &self.pyramid.levels[level - 1] }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_levels() {
    let image = Image::from_fn(40, 20, |x, _| x as u8);
    let frame = Frame::new(&image, None, 2);
    assert_eq!(frame.level_count(), 3);
    assert_eq!(frame.get_level(0), &image);
    assert_eq!(frame.get_level(1).width, 20);
    assert_eq!(frame.get_level(2).width, 10);

    let other = Image::from_fn(8, 8, |_, y| y as u8);
    let frame = Frame::new(&other, Some(frame), 1);
    assert_eq!(frame.level_count(), 2);
    assert_eq!(frame.get_level(0), &other);
    assert_eq!(frame.get_level(1).height, 4);
  }
}
