use std::io::{self, Read, Seek, SeekFrom};

/// Box with a compact header and a zero-filled payload, `total` bytes long.
pub fn mp4_box(kind: &[u8; 4], total: u32) -> Vec<u8> {
    mp4_box_with_payload(kind, &vec![0u8; total as usize - 8])
}

pub fn mp4_box_with_payload(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

/// `ftyp`(24) + `moov`(100) + `mdat`(1000), 1124 bytes in total.
pub fn ftyp_moov_mdat() -> Vec<u8> {
    let mut data = mp4_box(b"ftyp", 24);
    data.extend(mp4_box(b"moov", 100));
    data.extend(mp4_box(b"mdat", 1000));
    data
}

/// A read-only stream of `len` bytes that is zero everywhere except for a
/// few written regions. Lets tests describe multi-gigabyte files without
/// allocating them.
pub struct SparseStream {
    len: u64,
    regions: Vec<(u64, Vec<u8>)>,
    pos: u64,
}

impl SparseStream {
    pub fn new(len: u64) -> Self {
        Self {
            len,
            regions: Vec::new(),
            pos: 0,
        }
    }

    pub fn with_region(mut self, offset: u64, bytes: &[u8]) -> Self {
        self.regions.push((offset, bytes.to_vec()));
        self
    }

    fn byte_at(&self, offset: u64) -> u8 {
        self.regions
            .iter()
            .rev()
            .find(|(start, bytes)| offset >= *start && offset < start + bytes.len() as u64)
            .map(|(start, bytes)| bytes[(offset - start) as usize])
            .unwrap_or(0)
    }
}

impl Read for SparseStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.len.saturating_sub(self.pos);
        let n = (buf.len() as u64).min(available) as usize;
        for (i, slot) in buf[..n].iter_mut().enumerate() {
            *slot = self.byte_at(self.pos + i as u64);
        }
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for SparseStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        let Some(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start",
            ));
        };
        self.pos = target;
        Ok(target)
    }
}
