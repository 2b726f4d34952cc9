//! Streaming line decoder
//!
//! Splits a byte stream into lines on `\n` (a trailing `\r` is stripped, so
//! `\r\n` works too) and decodes each line as UTF-8. Invalid byte sequences
//! become U+FFFD and are recorded as [`DecodeWarning`]s. Only the current
//! line is held in memory.

use logtriage_core::DecodeWarning;
use sha2::{Digest, Sha256};
use std::io::{self, BufRead};

/// One decoded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    /// 1-based line number.
    pub number: usize,
    pub text: String,
}

/// Decode `bytes` best-effort, recording every replaced range.
///
/// `base_offset` is the stream offset of `bytes[0]`.
pub fn decode_lossy(
    bytes: &[u8],
    line_number: usize,
    base_offset: u64,
    warnings: &mut Vec<DecodeWarning>,
) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    let mut consumed = 0usize;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                break;
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                // valid_up_to marks a char boundary, so this never fails
                if let Ok(valid) = std::str::from_utf8(&rest[..valid_up_to]) {
                    out.push_str(valid);
                }
                out.push(char::REPLACEMENT_CHARACTER);

                let invalid_len = e.error_len().unwrap_or(rest.len() - valid_up_to);
                warnings.push(DecodeWarning {
                    line_number,
                    byte_offset: base_offset + (consumed + valid_up_to) as u64,
                    byte_len: invalid_len,
                });

                let skip = valid_up_to + invalid_len;
                consumed += skip;
                rest = &rest[skip..];
                if rest.is_empty() {
                    break;
                }
            }
        }
    }

    out
}

/// Reads decoded lines from a buffered byte stream.
pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
    bytes_read: u64,
    hasher: Sha256,
    warnings: Vec<DecodeWarning>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_number: 0,
            bytes_read: 0,
            hasher: Sha256::new(),
            warnings: Vec::new(),
        }
    }

    /// Read the next line, or `None` at end of input.
    pub fn next_line(&mut self) -> io::Result<Option<DecodedLine>> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }

        let line_offset = self.bytes_read;
        self.hasher.update(&self.buf);
        self.bytes_read += n as u64;
        self.line_number += 1;

        let mut content: &[u8] = &self.buf;
        if let Some(stripped) = content.strip_suffix(b"\n") {
            content = stripped;
        }
        if let Some(stripped) = content.strip_suffix(b"\r") {
            content = stripped;
        }

        let text = decode_lossy(content, self.line_number, line_offset, &mut self.warnings);
        Ok(Some(DecodedLine {
            number: self.line_number,
            text,
        }))
    }

    /// Bytes consumed so far, line terminators included.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of the last line returned.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<DecodeWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Hex SHA-256 of every byte consumed so far.
    pub fn content_digest(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }
}
