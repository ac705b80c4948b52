use crate::all::*;

pub fn format_log(
  buf: &mut env_logger::fmt::Formatter,
  record: &log::Record,
) -> std::io::Result<()> {
  use std::io::Write;
  use env_logger::fmt::Color::*;
  use log::Level::*;
  let mut style = buf.style();
  style.set_color(match record.level() {
    Error => Red,
    Warn => Yellow,
    Info => Green,
    Debug => Magenta,
    Trace => Blue,
  });
  let s = format!("{} {:24}{}",
    level_tag(record.level()),
    source_location(record.file(), record.line()),
    record.args(),
  );
  writeln!(buf, "{}", style.value(s))
}

fn level_tag(level: log::Level) -> char {
  match level {
    log::Level::Error => 'E',
    log::Level::Warn => 'W',
    log::Level::Info => 'I',
    log::Level::Debug => 'D',
    log::Level::Trace => 'T',
  }
}

// Shortened to the file name, the crate has no nested modules.
fn source_location(file: Option<&str>, line: Option<u32>) -> String {
  let file = file
    .map(|f| Path::new(f).file_name().and_then(|n| n.to_str()).unwrap_or(f))
    .unwrap_or("?");
  format!("{}:{}", file, line.unwrap_or(0))
}
