use std::io;
use std::io::{BufRead, BufWriter, Write};
use tracing::trace;

/// Line-oriented view over a pair of byte streams, usually the stdout/stdin pipes of an engine process.
pub struct LineChannel<R, W: Write> {
    reader: R,
    writer: BufWriter<W>,
}

impl<R, W: Write> LineChannel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        LineChannel {
            reader,
            writer: BufWriter::new(writer),
        }
    }

    pub fn write_line(&mut self, text: &str) -> io::Result<()> {
        trace!(line = text, "engine <");
        self.writer.write_all(text.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    /// Writes straight to the underlying stream, skipping the buffer.
    pub fn write_raw(&mut self, text: &str) -> io::Result<()> {
        trace!(line = text, "engine < (raw)");
        let stream = self.writer.get_mut();
        stream.write_all(text.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()
    }

    pub fn writer(&self) -> &W {
        self.writer.get_ref()
    }
}

impl<R: BufRead, W: Write> LineChannel<R, W> {
    /// Blocks for the next line. `None` means the stream has ended.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buffer = String::new();

        if self.reader.read_line(&mut buffer)? == 0 {
            return Ok(None);
        }

        let line = buffer.trim_end_matches(|c| c == '\n' || c == '\r');
        trace!(line, "engine >");

        Ok(Some(line.to_string()))
    }
}
