use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::channel::ValidatorChannel;
use super::framing::LineSource;
use super::{ChannelError, FormatRequest, FormatResponse, Handshake, ValidationService};

/// How long a terminated validator gets to exit before it is killed.
const EXIT_GRACE: Duration = Duration::from_secs(5);
const EXIT_POLL: Duration = Duration::from_millis(20);

/// What to run as the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Upper bound on each blocking read; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl ValidatorCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Lines forwarded from the child's stdout by a reader thread, so that each
/// read can be bounded by a timeout.
pub struct ReceiverLines {
    rx: Receiver<std::io::Result<String>>,
    timeout: Option<Duration>,
}

impl LineSource for ReceiverLines {
    fn next_line(&mut self) -> Result<Option<String>, ChannelError> {
        let received = match self.timeout {
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(line) => Some(line),
                Err(RecvTimeoutError::Timeout) => return Err(ChannelError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => None,
            },
            None => self.rx.recv().ok(),
        };
        match received {
            Some(line) => Ok(Some(line?)),
            None => Ok(None),
        }
    }
}

/// A validator running as a child process for the duration of one run.
///
/// Dropping it without calling [`ValidationService::terminate`] still sends
/// `EXIT` and reaps the child.
pub struct ProcessValidator {
    child: Child,
    channel: Option<ValidatorChannel<ReceiverLines, ChildStdin>>,
    stderr_forwarder: Option<JoinHandle<()>>,
}

impl ProcessValidator {
    pub fn spawn(command: &ValidatorCommand) -> Result<Self, ChannelError> {
        let spawn_error = |source| ChannelError::Spawn {
            command: command.display(),
            source,
        };

        log::info!("Starting validator: {}", command.display());
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let missing = |stream: &str| {
            spawn_error(std::io::Error::other(format!("failed to open validator {stream}")))
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let stderr_forwarder = thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                log::warn!("validator: {line}");
            }
        });

        let lines = ReceiverLines {
            rx,
            timeout: command.timeout,
        };

        Ok(Self {
            child,
            channel: Some(ValidatorChannel::new(lines, stdin)),
            stderr_forwarder: Some(stderr_forwarder),
        })
    }

    fn channel(
        &mut self,
    ) -> Result<&mut ValidatorChannel<ReceiverLines, ChildStdin>, ChannelError> {
        self.channel.as_mut().ok_or(ChannelError::Terminated)
    }

    /// Waits for the child to exit, killing it after the grace period.
    fn reap(&mut self) -> Result<(), ChannelError> {
        let deadline = Instant::now() + EXIT_GRACE;
        let status = loop {
            if let Some(status) = self.child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                log::warn!("Validator did not exit after EXIT; killing it");
                self.child.kill()?;
                break self.child.wait()?;
            }
            thread::sleep(EXIT_POLL);
        };

        if !status.success() {
            log::warn!("Validator exited with {status}");
        }
        if let Some(handle) = self.stderr_forwarder.take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl ValidationService for ProcessValidator {
    fn configure(
        &mut self,
        versions: &[String],
        extensions: &[String],
    ) -> Result<Handshake, ChannelError> {
        self.channel()?.configure(versions, extensions)
    }

    fn format(&mut self, request: &FormatRequest) -> Result<FormatResponse, ChannelError> {
        self.channel()?.format(request)
    }

    fn terminate(&mut self) -> Result<(), ChannelError> {
        let mut channel = self.channel.take().ok_or(ChannelError::Terminated)?;
        let sent = channel.terminate();
        // Dropping the channel closes the child's stdin
        drop(channel);
        let reaped = self.reap();
        sent.and(reaped)
    }
}

impl Drop for ProcessValidator {
    fn drop(&mut self) {
        if self.channel.is_some()
            && let Err(e) = self.terminate()
        {
            log::warn!("Failed to shut down validator: {e}");
        }
    }
}
