use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::supervisor::console::{Console, Stream};
use crate::supervisor::tagger::Tagger;

/// Splits a chunked byte stream into lines and prefixes each with a label.
///
/// Chunk boundaries need not match line boundaries: an incomplete tail is
/// held until a later chunk completes it or [`LinePrefixer::finish`] flushes
/// it. Only `\n` separates lines and no newline is ever added or removed.
pub struct LinePrefixer {
    prefix: Vec<u8>,
    pending: Vec<u8>,
}

impl LinePrefixer {
    pub fn new(tagger: &Tagger) -> Self {
        let mut prefix = tagger.render().into_bytes();
        prefix.push(b' ');
        Self {
            prefix,
            pending: Vec::new(),
        }
    }

    /// Feed one chunk; returns every line completed by it, labeled.
    pub fn transform(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (line, tail) = rest.split_at(pos + 1);
            out.extend_from_slice(&self.prefix);
            out.append(&mut self.pending);
            out.extend_from_slice(line);
            rest = tail;
        }
        self.pending.extend_from_slice(rest);
        out
    }

    /// Flush the unterminated tail, labeled, without a trailing newline.
    pub fn finish(mut self) -> Vec<u8> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let mut out = std::mem::take(&mut self.prefix);
        out.append(&mut self.pending);
        out
    }
}

/// Pump `reader` through `prefixer` into one of the console streams until EOF.
pub async fn relay<R>(
    mut reader: R,
    mut prefixer: LinePrefixer,
    console: Console,
    stream: Stream,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = [0u8; 8192];
    loop {
        let count = reader.read(&mut buffer).await?;
        if count == 0 {
            break;
        }
        console.write(stream, &prefixer.transform(&buffer[..count]))?;
    }
    console.write(stream, &prefixer.finish())
}
