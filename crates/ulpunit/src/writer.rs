//! Report sinks.
//!
//! Writers receive report text that still carries style placeholders. A
//! [`FormattedWriter`] resolves them with its style before writing to its
//! stream; [`BufferWriter`] keeps the raw text.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::style::{OutputFormat, Style};

/// Sink for report text.
///
/// Write failures are not reported; a broken output stream must not turn a
/// passing run into a failing one.
pub trait Writer: Send + Sync {
    fn write(&self, text: &str);
}

/// Applies a style, then writes to an output stream.
pub struct FormattedWriter {
    style: Box<dyn Style>,
    stream: Mutex<Box<dyn Write + Send>>,
}

impl FormattedWriter {
    #[must_use]
    pub fn new(style: Box<dyn Style>, stream: Box<dyn Write + Send>) -> Self {
        Self {
            style,
            stream: Mutex::new(stream),
        }
    }

    #[must_use]
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format.create(), Box::new(io::stdout()))
    }

    #[must_use]
    pub fn with_format(format: OutputFormat, stream: Box<dyn Write + Send>) -> Self {
        Self::new(format.create(), stream)
    }
}

impl Writer for FormattedWriter {
    fn write(&self, text: &str) {
        let rendered = self.style.apply(text);
        let mut stream = self.stream.lock();
        stream.write_all(rendered.as_bytes()).ok();
        stream.flush().ok();
    }
}

/// Broadcasts to every contained writer, in insertion order.
#[derive(Default)]
pub struct WriterCollection {
    writers: Vec<Box<dyn Writer>>,
}

impl WriterCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, writer: impl Writer + 'static) -> &mut Self {
        self.writers.push(Box::new(writer));
        self
    }

    #[must_use]
    pub fn with(mut self, writer: impl Writer + 'static) -> Self {
        self.push(writer);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl Writer for WriterCollection {
    fn write(&self, text: &str) {
        for writer in &self.writers {
            writer.write(text);
        }
    }
}

/// Cloneable in-memory byte sink.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Captures report text with placeholders left unresolved.
#[derive(Debug, Clone, Default)]
pub struct BufferWriter {
    buffer: SharedBuffer,
}

impl BufferWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text with placeholders still in place.
    #[must_use]
    pub fn contents(&self) -> String {
        self.buffer.contents()
    }

    /// Text resolved through `style`.
    #[must_use]
    pub fn render(&self, style: &dyn Style) -> String {
        style.apply(&self.contents())
    }
}

impl Writer for BufferWriter {
    fn write(&self, text: &str) {
        self.buffer.0.lock().extend_from_slice(text.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{FancyStyle, RawStyle};

    #[test]
    fn formatted_writer_resolves_placeholders() {
        let sink = SharedBuffer::new();
        let writer = FormattedWriter::new(Box::new(RawStyle), Box::new(sink.clone()));
        writer.write("[/bold_on]ok[/bold_off]\n");
        assert_eq!(sink.contents(), "ok\n");
    }

    #[test]
    fn collection_broadcasts_in_order() {
        let first = BufferWriter::new();
        let second = BufferWriter::new();
        let all = WriterCollection::new()
            .with(first.clone())
            .with(second.clone());
        all.write("a");
        all.write("b");
        assert_eq!(all.len(), 2);
        assert_eq!(first.contents(), "ab");
        assert_eq!(second.contents(), "ab");
    }

    #[test]
    fn buffer_writer_keeps_raw_text() {
        let writer = BufferWriter::new();
        writer.write("[/warning_color]x");
        assert_eq!(writer.contents(), "[/warning_color]x");
        assert_eq!(writer.render(&FancyStyle), "\x1b[31mx");
    }
}
