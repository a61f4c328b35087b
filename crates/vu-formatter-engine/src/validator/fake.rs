use std::collections::VecDeque;

use super::{ChannelError, FormatRequest, FormatResponse, Handshake, ValidationService};

type Responder = Box<dyn FnMut(&FormatRequest) -> Result<FormatResponse, ChannelError>>;

/// In-memory validator with deterministic verdicts.
///
/// Records everything it is asked so callers can inspect the exchange.
pub struct FakeValidator {
    responder: Responder,
    handshake: Handshake,
    configured: Option<(Vec<String>, Vec<String>)>,
    requests: Vec<FormatRequest>,
    terminate_calls: usize,
}

impl FakeValidator {
    pub fn new(
        responder: impl FnMut(&FormatRequest) -> Result<FormatResponse, ChannelError> + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            handshake: Handshake {
                accepted: true,
                diagnostics: Vec::new(),
            },
            configured: None,
            requests: Vec::new(),
            terminate_calls: 0,
        }
    }

    /// Passes every statement, returning its text unchanged.
    pub fn echo() -> Self {
        Self::new(|request| Ok(FormatResponse::passed(request.text.lines())))
    }

    /// Answers requests with `responses` in order. Running out behaves like a
    /// validator that closed its output.
    pub fn scripted(responses: impl IntoIterator<Item = FormatResponse>) -> Self {
        let mut responses: VecDeque<_> = responses.into_iter().collect();
        Self::new(move |_| {
            responses.pop_front().ok_or(ChannelError::UnexpectedEof {
                awaiting: super::protocol::FORMAT_VU,
            })
        })
    }

    pub fn rejecting_configuration(
        mut self,
        diagnostics: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.handshake = Handshake {
            accepted: false,
            diagnostics: diagnostics.into_iter().map(Into::into).collect(),
        };
        self
    }

    pub fn requests(&self) -> &[FormatRequest] {
        &self.requests
    }

    /// Versions and extensions announced, if configured.
    pub fn configured(&self) -> Option<(&[String], &[String])> {
        self.configured
            .as_ref()
            .map(|(v, e)| (v.as_slice(), e.as_slice()))
    }

    pub fn terminate_calls(&self) -> usize {
        self.terminate_calls
    }

    fn ensure_open(&self) -> Result<(), ChannelError> {
        if self.terminate_calls > 0 {
            Err(ChannelError::Terminated)
        } else {
            Ok(())
        }
    }
}

impl ValidationService for FakeValidator {
    fn configure(
        &mut self,
        versions: &[String],
        extensions: &[String],
    ) -> Result<Handshake, ChannelError> {
        self.ensure_open()?;
        self.configured = Some((versions.to_vec(), extensions.to_vec()));
        Ok(self.handshake.clone())
    }

    fn format(&mut self, request: &FormatRequest) -> Result<FormatResponse, ChannelError> {
        self.ensure_open()?;
        self.requests.push(request.clone());
        (self.responder)(request)
    }

    fn terminate(&mut self) -> Result<(), ChannelError> {
        self.terminate_calls += 1;
        if self.terminate_calls > 1 {
            return Err(ChannelError::Terminated);
        }
        Ok(())
    }
}
