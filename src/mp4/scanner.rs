//! Top-level box walking.
//!
//! The scanner reads box headers only and seeks over payloads, so a payload
//! that happens to contain another box's type tag can never be mistaken for
//! structure.

use crate::mp4::InjectError;
use crate::mp4::fourcc::{FourCC, UUID};
use std::io::{ErrorKind as IoErrorKind, Read, Seek, SeekFrom};

/// Length of the `uuid` user type that follows the size/type fields.
pub const USER_TYPE_LEN: u64 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderWidth {
    /// 32-bit size + type.
    Compact,
    /// `size == 1` followed by a 64-bit size.
    Extended,
}

impl HeaderWidth {
    pub const fn len(self) -> u64 {
        match self {
            HeaderWidth::Compact => 8,
            HeaderWidth::Extended => 16,
        }
    }
}

/// One top-level box of a scanned stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoxRecord {
    pub box_type: FourCC,
    pub header_offset: u64,
    /// Always `header_offset + header_width.len()`.
    pub content_offset: u64,
    pub total_size: u64,
    pub header_width: HeaderWidth,
    /// User type of a `uuid` box.
    pub extended_type: Option<[u8; 16]>,
}

impl BoxRecord {
    pub fn end_offset(&self) -> u64 {
        self.header_offset + self.total_size
    }
}

/// Iterator over the top-level boxes of a stream of known length.
///
/// Restartable only by building a new scanner. The iterator fuses after the
/// first error and after a box that runs to the end of the stream.
pub struct BoxScanner<R> {
    reader: R,
    stream_len: u64,
    position: u64,
    done: bool,
}

impl<R: Read + Seek> BoxScanner<R> {
    pub fn new(reader: R, stream_len: u64) -> Self {
        Self {
            reader,
            stream_len,
            position: 0,
            done: false,
        }
    }

    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), InjectError> {
        let stream_len = self.stream_len;
        self.reader.seek(SeekFrom::Start(offset))?;
        self.reader.read_exact(buf).map_err(|error| {
            if error.kind() == IoErrorKind::UnexpectedEof {
                // The stream is shorter than it claimed to be.
                InjectError::TruncatedStream {
                    offset,
                    declared: buf.len() as u64,
                    available: stream_len.saturating_sub(offset),
                }
            } else {
                InjectError::Io(error)
            }
        })
    }

    fn next_record(&mut self) -> Result<Option<BoxRecord>, InjectError> {
        let offset = self.position;
        let remaining = self.stream_len - offset;
        if remaining == 0 {
            return Ok(None);
        }

        if remaining < HeaderWidth::Compact.len() {
            return Err(InjectError::TruncatedStream {
                offset,
                declared: HeaderWidth::Compact.len(),
                available: remaining,
            });
        }

        let mut header = [0u8; 8];
        self.read_exact_at(offset, &mut header)?;
        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let box_type = FourCC::new([header[4], header[5], header[6], header[7]]);

        let (header_width, total_size) = match size {
            0 => {
                self.done = true;
                (HeaderWidth::Compact, remaining)
            }
            1 => {
                if remaining < HeaderWidth::Extended.len() {
                    return Err(InjectError::TruncatedStream {
                        offset,
                        declared: HeaderWidth::Extended.len(),
                        available: remaining,
                    });
                }
                let mut large = [0u8; 8];
                self.read_exact_at(offset + 8, &mut large)?;
                let large = u64::from_be_bytes(large);
                if large < HeaderWidth::Extended.len() {
                    return Err(InjectError::malformed(
                        offset,
                        format!("extended size {large} of '{box_type}' is smaller than its header"),
                    ));
                }
                (HeaderWidth::Extended, large)
            }
            2..=7 => {
                return Err(InjectError::malformed(
                    offset,
                    format!("invalid size {size} for '{box_type}'"),
                ));
            }
            size => (HeaderWidth::Compact, u64::from(size)),
        };

        if total_size > remaining {
            return Err(InjectError::TruncatedStream {
                offset,
                declared: total_size,
                available: remaining,
            });
        }

        let content_offset = offset + header_width.len();
        let extended_type = if box_type == UUID {
            if total_size < header_width.len() + USER_TYPE_LEN {
                return Err(InjectError::malformed(
                    offset,
                    format!("'uuid' box of {total_size} bytes cannot hold its user type"),
                ));
            }
            let mut user_type = [0u8; 16];
            self.read_exact_at(content_offset, &mut user_type)?;
            Some(user_type)
        } else {
            None
        };

        self.position = offset + total_size;
        Ok(Some(BoxRecord {
            box_type,
            header_offset: offset,
            content_offset,
            total_size,
            header_width,
            extended_type,
        }))
    }
}

impl<R: Read + Seek> Iterator for BoxScanner<R> {
    type Item = Result<BoxRecord, InjectError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done && self.position == self.stream_len {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                // Park at the end so the iterator stays fused.
                self.done = true;
                self.position = self.stream_len;
                Some(Err(error))
            }
        }
    }
}

/// Scans the whole stream and collects its top-level boxes.
pub fn scan_boxes<R: Read + Seek>(reader: R, stream_len: u64) -> Result<Vec<BoxRecord>, InjectError> {
    BoxScanner::new(reader, stream_len).collect()
}
