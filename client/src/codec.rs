//! Line framing codec for engine communication.
//!
//! The engine's wire protocol is newline-delimited: each request is one line
//! of JSON terminated by `\n`, each reply is one JSON object per output
//! line. This module provides [`LineReader`] and [`LineWriter`] for async
//! reading and writing of those lines.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{Error, Result};

/// Maximum line size (4 MiB) to prevent unbounded memory allocation.
const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Reads newline-delimited lines from an async reader.
pub struct LineReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next line, without its terminator.
    ///
    /// Returns `Ok(None)` on EOF (clean shutdown). A final unterminated
    /// line before EOF is returned as a line. Returns `Err` on oversized
    /// lines or non-UTF-8 output.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let mut limited = (&mut self.reader).take(MAX_LINE_BYTES as u64 + 1);
        let bytes_read = limited.read_until(b'\n', &mut buf).await?;

        if bytes_read == 0 {
            return Ok(None); // EOF
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        if buf.len() > MAX_LINE_BYTES {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("engine output line exceeds maximum {MAX_LINE_BYTES} bytes"),
            )));
        }

        let line = String::from_utf8(buf).map_err(|e| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("engine output is not valid UTF-8: {e}"),
            ))
        })?;
        Ok(Some(line))
    }
}

/// Writes newline-terminated JSON lines to an async writer.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one serialized line followed by `\n` and flush.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip() {
        let mut buf = Vec::new();
        let mut writer = LineWriter::new(&mut buf);
        writer.write_line(r#"{"request":1}"#).await.unwrap();

        let mut reader = LineReader::new(buf.as_slice());
        let line = reader.read_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"request":1}"#);
        assert!(reader.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_multiple_lines() {
        let buf: &[u8] = b"first\nsecond\n";
        let mut reader = LineReader::new(buf);
        assert_eq!(reader.read_line().await.unwrap().unwrap(), "first");
        assert_eq!(reader.read_line().await.unwrap().unwrap(), "second");
        assert!(reader.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eof_returns_none() {
        let buf: &[u8] = b"";
        let mut reader = LineReader::new(buf);
        assert!(reader.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unterminated_final_line() {
        let buf: &[u8] = b"partial";
        let mut reader = LineReader::new(buf);
        assert_eq!(reader.read_line().await.unwrap().unwrap(), "partial");
        assert!(reader.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_crlf_stripped() {
        let buf: &[u8] = b"line\r\n";
        let mut reader = LineReader::new(buf);
        assert_eq!(reader.read_line().await.unwrap().unwrap(), "line");
    }

    #[tokio::test]
    async fn test_empty_line_is_a_line() {
        let buf: &[u8] = b"\nafter\n";
        let mut reader = LineReader::new(buf);
        assert_eq!(reader.read_line().await.unwrap().unwrap(), "");
        assert_eq!(reader.read_line().await.unwrap().unwrap(), "after");
    }

    #[tokio::test]
    async fn test_oversized_line_rejected() {
        let mut buf = vec![b'a'; MAX_LINE_BYTES + 1];
        buf.push(b'\n');
        let mut reader = LineReader::new(buf.as_slice());
        assert!(reader.read_line().await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_utf8_rejected() {
        let buf: &[u8] = b"\xff\xfe\n";
        let mut reader = LineReader::new(buf);
        assert!(reader.read_line().await.is_err());
    }

    #[tokio::test]
    async fn test_writer_appends_newline() {
        let mut buf = Vec::new();
        let mut writer = LineWriter::new(&mut buf);
        writer.write_line("abc").await.unwrap();
        assert_eq!(buf, b"abc\n");
    }
}
