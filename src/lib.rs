use std::io::{self, BufRead, ErrorKind};

/// Blocking "read one line" primitive the timed read races against its deadline.
pub trait LineSource: Send + 'static {
    /// Reads one line, newline included if present.
    ///
    /// Bytes that are not valid UTF-8 are decoded lossily.
    ///
    /// Reaching the end of input before any byte is read is reported as
    /// [`ErrorKind::UnexpectedEof`].
    fn read_line(&mut self) -> io::Result<String>;
}

impl<T> LineSource for T
where
    T: BufRead + Send + 'static,
{
    fn read_line(&mut self) -> io::Result<String> {
        let mut line = Vec::new();
        match self.read_until(b'\n', &mut line)? {
            0 => Err(io::Error::from(ErrorKind::UnexpectedEof)),
            _ => Ok(String::from_utf8_lossy(&line).into_owned()),
        }
    }
}

/// Zero-information token handed over a channel to say "something happened".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal;

/// Prints one `[label] message` diagnostic line.
pub fn report(label: &str, msg: &str) {
    tracing::trace!(label, msg, "report");
    println!("[{label}] {msg}");
}

pub mod deadline;
pub mod leak;
pub mod logging;
pub mod timed_read;

pub use deadline::Deadline;
