use crate::mp4::fourcc::{MDAT, UUID};
use crate::mp4::scanner::{BoxRecord, HeaderWidth};
use crate::mp4::spherical::SPHERICAL_UUID;

/// A compact box header stores its size in 32 bits; at or above this length
/// the box is written with a 64-bit size instead.
pub const EXTENDED_SIZE_THRESHOLD: u64 = u32::MAX as u64;

/// Where the metadata box goes and how its size is encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetadataBoxPlan {
    pub insertion_offset: u64,
    pub use_extended_size: bool,
    /// Number of top-level `mdat` boxes seen. Only the first one anchors the
    /// insertion; more than one usually means fragmented content.
    pub media_data_count: usize,
}

/// Picks the insertion point for a metadata box carrying `payload_len` bytes.
///
/// The box goes right before the first top-level `mdat`, or after the last
/// box when there is none. Insertion always lands on a top-level boundary, so
/// no parent box sizes ever need patching.
pub fn plan_injection(records: &[BoxRecord], payload_len: u64) -> MetadataBoxPlan {
    let mut media_data = records.iter().filter(|record| record.box_type == MDAT);
    let media_data_count = media_data.clone().count();

    let insertion_offset = match media_data.next() {
        Some(first) => first.header_offset,
        None => records.last().map(BoxRecord::end_offset).unwrap_or(0),
    };

    MetadataBoxPlan {
        insertion_offset,
        use_extended_size: needs_extended_size(payload_len),
        media_data_count,
    }
}

/// Whether a `uuid` box with `payload_len` bytes of payload outgrows a compact header.
pub fn needs_extended_size(payload_len: u64) -> bool {
    let compact_len = HeaderWidth::Compact
        .len()
        .saturating_add(SPHERICAL_UUID.len() as u64)
        .saturating_add(payload_len);
    compact_len >= EXTENDED_SIZE_THRESHOLD
}

/// First top-level spherical metadata box, if the stream already carries one.
pub fn find_spherical_marker(records: &[BoxRecord]) -> Option<&BoxRecord> {
    records
        .iter()
        .find(|record| record.box_type == UUID && record.extended_type == Some(SPHERICAL_UUID))
}
