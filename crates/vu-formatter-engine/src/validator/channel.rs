use std::io::Write;

use super::framing::{FramedReader, FramedWriter, LineSource};
use super::protocol::{
    EXIT, FORMAT_VU, FORMAT_VU_ELIMINATED, FORMAT_VU_END, FORMAT_VU_SUCCESS, VERSIONS,
    VERSIONS_END, VERSIONS_SUCCESS, encode_attributes, encode_location,
};
use super::{ChannelError, FormatRequest, FormatResponse, Handshake, ValidationService, Verdict};

/// Protocol client over a line source (validator output) and a writer
/// (validator input).
///
/// Works the same over a child's pipes or in-memory buffers.
pub struct ValidatorChannel<S, W> {
    reader: FramedReader<S>,
    writer: FramedWriter<W>,
    terminated: bool,
}

impl<S: LineSource, W: Write> ValidatorChannel<S, W> {
    pub fn new(source: S, sink: W) -> Self {
        Self {
            reader: FramedReader::new(source),
            writer: FramedWriter::new(sink),
            terminated: false,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// The sink requests are written to.
    pub fn sink(&self) -> &W {
        self.writer.get_ref()
    }

    fn ensure_open(&self) -> Result<(), ChannelError> {
        if self.terminated {
            Err(ChannelError::Terminated)
        } else {
            Ok(())
        }
    }

    fn read_format_response(&mut self) -> Result<FormatResponse, ChannelError> {
        let diagnostics = self
            .reader
            .read_until(FORMAT_VU, |l| l.starts_with(FORMAT_VU))?;
        if diagnostics.terminator.trim_end() != FORMAT_VU {
            return Err(ChannelError::Framing {
                expected: FORMAT_VU,
                found: diagnostics.terminator,
            });
        }

        let body = self
            .reader
            .read_until(FORMAT_VU_SUCCESS, |l| l.starts_with(FORMAT_VU))?;
        let verdict = match body.terminator.trim() {
            FORMAT_VU_SUCCESS => Verdict::Passed {
                lines: body
                    .lines
                    .into_iter()
                    .map(|l| l.trim_end().to_string())
                    .collect(),
            },
            FORMAT_VU_ELIMINATED => Verdict::Eliminated,
            // A second frame opener means the two sides disagree on framing
            FORMAT_VU => {
                return Err(ChannelError::Framing {
                    expected: FORMAT_VU_SUCCESS,
                    found: body.terminator,
                });
            }
            _ => Verdict::Failed,
        };

        Ok(FormatResponse {
            diagnostics: diagnostics
                .lines
                .into_iter()
                .map(|l| l.trim_end().to_string())
                .collect(),
            verdict,
        })
    }
}

impl<S: LineSource, W: Write> ValidationService for ValidatorChannel<S, W> {
    fn configure(
        &mut self,
        versions: &[String],
        extensions: &[String],
    ) -> Result<Handshake, ChannelError> {
        self.ensure_open()?;
        let versions = versions.join(" ");
        let extensions = extensions.join(" ");
        self.writer.write_frame(
            VERSIONS,
            [versions.as_str(), extensions.as_str()],
            VERSIONS_END,
        )?;

        let frame = self
            .reader
            .read_until(VERSIONS_SUCCESS, |l| l.starts_with(VERSIONS))?;
        let accepted = frame.terminator.trim() == VERSIONS_SUCCESS;
        log::debug!("validator configuration answered with {:?}", frame.terminator);

        Ok(Handshake {
            accepted,
            diagnostics: frame.lines,
        })
    }

    fn format(&mut self, request: &FormatRequest) -> Result<FormatResponse, ChannelError> {
        self.ensure_open()?;
        let (file, line) = encode_location(request.location.as_ref());
        let attributes = encode_attributes(&request.attributes);
        self.writer.write_frame(
            FORMAT_VU,
            [
                request.api.as_str(),
                file.as_str(),
                line.as_str(),
                attributes.as_str(),
                request.text.as_str(),
            ],
            FORMAT_VU_END,
        )?;

        self.read_format_response()
    }

    fn terminate(&mut self) -> Result<(), ChannelError> {
        self.ensure_open()?;
        self.terminated = true;
        self.writer.write_line(EXIT)?;
        self.writer.flush()
    }
}
