use std::io::{BufRead, Write};

use super::ChannelError;

/// A blocking source of lines with their terminators removed.
///
/// `Ok(None)` means the peer closed its end.
pub trait LineSource {
    fn next_line(&mut self) -> Result<Option<String>, ChannelError>;
}

/// Adapts any [`BufRead`] into a [`LineSource`].
pub struct ReaderLines<R> {
    reader: R,
}

impl<R: BufRead> ReaderLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderLines<R> {
    fn next_line(&mut self) -> Result<Option<String>, ChannelError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
        Ok(Some(line))
    }
}

/// Lines read up to, and the line that ended, a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub lines: Vec<String>,
    pub terminator: String,
}

/// Reads sentinel-terminated frames.
pub struct FramedReader<S> {
    source: S,
}

impl<S: LineSource> FramedReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Collects lines until one satisfies `is_end`.
    ///
    /// `awaiting` names the expected sentinel for the error raised if the
    /// source runs dry first.
    pub fn read_until(
        &mut self,
        awaiting: &'static str,
        mut is_end: impl FnMut(&str) -> bool,
    ) -> Result<Frame, ChannelError> {
        let mut lines = Vec::new();
        loop {
            match self.source.next_line()? {
                Some(line) if is_end(&line) => {
                    return Ok(Frame {
                        lines,
                        terminator: line,
                    });
                }
                Some(line) => lines.push(line),
                None => return Err(ChannelError::UnexpectedEof { awaiting }),
            }
        }
    }
}

/// Writes sentinel-terminated frames.
pub struct FramedWriter<W> {
    writer: W,
}

impl<W: Write> FramedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Writes `open`, each body line, then `close`, and flushes.
    pub fn write_frame<'a>(
        &mut self,
        open: &str,
        body: impl IntoIterator<Item = &'a str>,
        close: &str,
    ) -> Result<(), ChannelError> {
        self.write_line(open)?;
        for line in body {
            self.write_line(line)?;
        }
        self.write_line(close)?;
        self.flush()
    }

    pub fn flush(&mut self) -> Result<(), ChannelError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}
