use crate::all::*;

// Replays recorded sensor events from a JSONL file, one event per line:
//
//   {"time": 0.01, "sensor": {"type": "linearAcceleration", "values": [x, y, z]}}
//   {"time": 0.01, "sensor": {"type": "accelerometer", "values": [x, y, z]}}
//   {"time": 0.03, "frames": [{"number": 0}]}
pub struct Input {
  reader: Box<dyn BufRead>,
  line: String,
  line_number: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputData {
  Motion(MotionSample),
  // Signals that the next video frame was captured at `time`.
  Frame { time: f64 },
}

impl Input {
  pub fn new(path: &Path) -> Result<Input> {
    let file = File::open(path)
      .context(format!("Failed to open input file {}.", path.display()))?;
    Ok(Input::from_reader(BufReader::new(file)))
  }

  pub fn from_reader<R: BufRead + 'static>(reader: R) -> Input {
    Input {
      reader: Box::new(reader),
      line: String::new(),
      line_number: 0,
    }
  }

  // Not using `impl Iterator` to allow returning `Result`.
  // End of data is signaled by `Result::Ok(Option::None)`.
  pub fn next(&mut self) -> Result<Option<InputData>> {
    loop {
      self.line.clear();
      match self.reader.read_line(&mut self.line) {
        Ok(0) => return Ok(None),
        Err(err) => bail!("Failed to read line. {}", err),
        _ => {},
      }
      self.line_number += 1;
      if self.line.trim().is_empty() { continue }
      let data = parse_line(&self.line)
        .context(format!("Input line {}: {}", self.line_number, self.line.trim()))?;
      if let Some(data) = data {
        return Ok(Some(data));
      }
    }
  }
}

fn parse_line(line: &str) -> Result<Option<InputData>> {
  let value: serde_json::Value = serde_json::from_str(line)
    .context("JSON deserialization failed.")?;
  let value = value.as_object()
    .ok_or(anyhow!("JSONL line is not a map."))?;
  let time = value.get("time").and_then(|x| x.as_f64())
    .ok_or(anyhow!("Time is not a number."))?;

  if let Some(sensor) = value.get("sensor") {
    let sensor_type = sensor["type"].as_str()
      .ok_or(anyhow!("Sensor type is not a string."))?;
    let v = sensor["values"].as_array()
      .ok_or(anyhow!("Sensor values field is not an array"))?;
    let v = v.iter()
      .map(|x| x.as_f64().ok_or(anyhow!("Sensor value is not a number.")))
      .collect::<Result<Vec<f64>>>()?;
    if v.len() < 3 {
      bail!("Expected 3 sensor values, got {}.", v.len());
    }
    let v = Vector3d::new(v[0], v[1], v[2]);
    match sensor_type {
      "linearAcceleration" => Ok(Some(InputData::Motion(MotionSample {
        time,
        acceleration: Some(v),
        acceleration_including_gravity: None,
      }))),
      "accelerometer" => Ok(Some(InputData::Motion(MotionSample {
        time,
        acceleration: None,
        acceleration_including_gravity: Some(v),
      }))),
      "gyroscope" => Ok(None),
      _ => {
        warn!("Unknown sensor type {}", sensor_type);
        Ok(None)
      },
    }
  }
  else if value.contains_key("frames") {
    Ok(Some(InputData::Frame { time }))
  }
  else if value.contains_key("groundTruth") {
    Ok(None)
  }
  else {
    warn!("Unrecognized data: {}", line.trim());
    Ok(None)
  }
}
