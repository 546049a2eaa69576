use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Which of the console's two streams a write goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

pub type CaptureBuffer = Arc<Mutex<Vec<u8>>>;

/// Writer shared by every relay that targets the same stream.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Destination for relayed process output and exit summaries.
///
/// `Terminal` writes to the controlling process's own stdout/stderr.
/// `Capture` appends to in-memory buffers, used to observe output in tests.
/// `Writers` sends each stream to an arbitrary writer, e.g. a log file.
#[derive(Clone, Default)]
pub enum Console {
    #[default]
    Terminal,
    Capture {
        stdout: CaptureBuffer,
        stderr: CaptureBuffer,
    },
    Writers {
        stdout: SharedWriter,
        stderr: SharedWriter,
    },
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Console::Terminal => f.write_str("Terminal"),
            Console::Capture { .. } => f.write_str("Capture"),
            Console::Writers { .. } => f.write_str("Writers"),
        }
    }
}

impl Console {
    pub fn capture() -> Self {
        Console::Capture {
            stdout: Arc::new(Mutex::new(Vec::new())),
            stderr: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn writers<O, E>(stdout: O, stderr: E) -> Self
    where
        O: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        Console::Writers {
            stdout: Arc::new(Mutex::new(stdout)),
            stderr: Arc::new(Mutex::new(stderr)),
        }
    }

    /// Write a batch of bytes atomically with respect to other writers.
    pub fn write(&self, stream: Stream, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        match self {
            Console::Terminal => match stream {
                Stream::Stdout => {
                    let mut out = io::stdout().lock();
                    out.write_all(bytes)?;
                    out.flush()
                }
                Stream::Stderr => {
                    let mut err = io::stderr().lock();
                    err.write_all(bytes)?;
                    err.flush()
                }
            },
            Console::Capture { stdout, stderr } => {
                let buffer = match stream {
                    Stream::Stdout => stdout,
                    Stream::Stderr => stderr,
                };
                buffer.lock().extend_from_slice(bytes);
                Ok(())
            }
            Console::Writers { stdout, stderr } => {
                let writer = match stream {
                    Stream::Stdout => stdout,
                    Stream::Stderr => stderr,
                };
                let mut writer = writer.lock();
                writer.write_all(bytes)?;
                writer.flush()
            }
        }
    }

    /// Write one line of text followed by a newline.
    pub fn line(&self, stream: Stream, text: &str) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(b'\n');
        self.write(stream, &bytes)
    }

    /// Captured stdout as lossy UTF-8. Empty unless capturing.
    pub fn captured_stdout(&self) -> String {
        match self {
            Console::Capture { stdout, .. } => String::from_utf8_lossy(&stdout.lock()).into_owned(),
            _ => String::new(),
        }
    }

    /// Captured stderr as lossy UTF-8. Empty unless capturing.
    pub fn captured_stderr(&self) -> String {
        match self {
            Console::Capture { stderr, .. } => String::from_utf8_lossy(&stderr.lock()).into_owned(),
            _ => String::new(),
        }
    }
}
