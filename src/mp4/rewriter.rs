use crate::mp4::InjectError;
use std::io::{Error as IoError, ErrorKind as IoErrorKind, Read, Seek, SeekFrom, Write};
use tokio_util::sync::CancellationToken;

/// Bytes moved per read/write round trip while copying the input.
pub const COPY_CHUNK_SIZE: usize = 256 * 1024;

/// Writes `input[..offset] ++ new_box ++ input[offset..]` to `output`.
///
/// The input is streamed in `COPY_CHUNK_SIZE` chunks and the cancellation
/// token is checked between chunks. Returns the number of bytes written,
/// which is always `input_len + new_box.len()`.
pub fn splice<R, W>(
    input: &mut R,
    input_len: u64,
    insertion_offset: u64,
    new_box: &[u8],
    output: &mut W,
    cancel: &CancellationToken,
) -> Result<u64, InjectError>
where
    R: Read + Seek,
    W: Write,
{
    if insertion_offset > input_len {
        return Err(InjectError::Io(IoError::new(
            IoErrorKind::InvalidInput,
            format!("insertion offset {insertion_offset} is past the end of a {input_len} byte stream"),
        )));
    }

    input.seek(SeekFrom::Start(0))?;
    let mut buf = vec![0u8; COPY_CHUNK_SIZE];

    copy_span(input, output, 0, insertion_offset, &mut buf, cancel)?;
    if cancel.is_cancelled() {
        return Err(InjectError::Cancelled);
    }
    output.write_all(new_box)?;
    copy_span(
        input,
        output,
        insertion_offset,
        input_len - insertion_offset,
        &mut buf,
        cancel,
    )?;
    output.flush()?;

    Ok(input_len + new_box.len() as u64)
}

/// Copies exactly `len` bytes; `start` is only used for error reporting.
fn copy_span<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    start: u64,
    len: u64,
    buf: &mut [u8],
    cancel: &CancellationToken,
) -> Result<(), InjectError> {
    let mut remaining = len;
    while remaining > 0 {
        if cancel.is_cancelled() {
            return Err(InjectError::Cancelled);
        }

        let want = remaining.min(buf.len() as u64) as usize;
        let read = match input.read(&mut buf[..want]) {
            Ok(0) => {
                return Err(InjectError::TruncatedStream {
                    offset: start,
                    declared: len,
                    available: len - remaining,
                });
            }
            Ok(n) => n,
            Err(error) if error.kind() == IoErrorKind::Interrupted => continue,
            Err(error) => return Err(error.into()),
        };

        output.write_all(&buf[..read])?;
        remaining -= read as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::test_utils::ftyp_moov_mdat;
    use std::io::Cursor;

    fn run_splice(input: &[u8], offset: u64, new_box: &[u8]) -> Result<Vec<u8>, InjectError> {
        let mut output = Vec::new();
        let written = splice(
            &mut Cursor::new(input),
            input.len() as u64,
            offset,
            new_box,
            &mut output,
            &CancellationToken::new(),
        )?;
        assert_eq!(written, output.len() as u64);
        Ok(output)
    }

    #[test]
    fn test_splice_preserves_surrounding_bytes() {
        let input = ftyp_moov_mdat();
        let new_box = b"NEWBOX-BYTES";

        for offset in [0u64, 24, 124, input.len() as u64] {
            let output = run_splice(&input, offset, new_box).unwrap();
            let offset = offset as usize;

            assert_eq!(output.len(), input.len() + new_box.len());
            assert_eq!(&output[..offset], &input[..offset]);
            assert_eq!(&output[offset..offset + new_box.len()], new_box);
            assert_eq!(&output[offset + new_box.len()..], &input[offset..]);
        }
    }

    #[test]
    fn test_splice_spans_multiple_chunks() {
        let input = (0..(COPY_CHUNK_SIZE * 3 + 17))
            .map(|i| (i % 251) as u8)
            .collect::<Vec<_>>();
        let offset = COPY_CHUNK_SIZE as u64 + 5;

        let output = run_splice(&input, offset, b"xyz").unwrap();
        let offset = offset as usize;
        assert_eq!(&output[..offset], &input[..offset]);
        assert_eq!(&output[offset..offset + 3], b"xyz");
        assert_eq!(&output[offset + 3..], &input[offset..]);
    }

    #[test]
    fn test_splice_rejects_offset_past_end() {
        let err = run_splice(b"abcd", 5, b"x").unwrap_err();
        assert!(matches!(err, InjectError::Io(_)));
    }

    #[test]
    fn test_splice_reports_short_input() {
        let input = ftyp_moov_mdat();
        let mut output = Vec::new();
        let err = splice(
            &mut Cursor::new(&input),
            input.len() as u64 + 10,
            124,
            b"x",
            &mut output,
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, InjectError::TruncatedStream { offset: 124, .. }));
    }

    #[test]
    fn test_cancelled_splice_writes_nothing() {
        let input = ftyp_moov_mdat();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut output = Vec::new();
        let err = splice(
            &mut Cursor::new(&input),
            input.len() as u64,
            124,
            b"x",
            &mut output,
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, InjectError::Cancelled));
        assert!(output.is_empty());
    }
}
