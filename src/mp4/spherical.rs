//! The spherical video marker box.
//!
//! Players match on these bytes exactly. Do not reformat either constant.

use crate::mp4::fourcc::UUID;
use crate::mp4::planner::needs_extended_size;
use crate::mp4::scanner::HeaderWidth;

/// User type of the spherical video `uuid` box.
pub const SPHERICAL_UUID: [u8; 16] = [
    0xFF, 0xE4, 0x81, 0x84, 0xAB, 0xA1, 0xD6, 0x46, 0x24, 0xD8, 0x9F, 0xBD, 0xBA, 0xA2, 0x43, 0xF7,
];

/// RDF/XML descriptor carried as the box payload.
pub const SPHERICAL_METADATA: &[u8] = concat!(
    "<rdf:SphericalVideo xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n",
    "  <SphericalVideo>true</SphericalVideo>\n",
    "  <Projection>equirectangular</Projection>\n",
    "  <InitialViewHeadingDegrees>0</InitialViewHeadingDegrees>\n",
    "  <InitialViewPitchDegrees>0</InitialViewPitchDegrees>\n",
    "  <InitialViewRollDegrees>0</InitialViewRollDegrees>\n",
    "  <stitched>true</stitched>\n",
    "  <stitching_software>360VideoConverter</stitching_software>\n",
    "  <stereo_mode>mono</stereo_mode>\n",
    "  <source_count>1</source_count>\n",
    "</rdf:SphericalVideo>",
)
.as_bytes();

/// Total length of the metadata box for a given header encoding.
pub fn metadata_box_len(use_extended_size: bool, payload_len: u64) -> u64 {
    let header = if use_extended_size {
        HeaderWidth::Extended
    } else {
        HeaderWidth::Compact
    };
    header.len() + SPHERICAL_UUID.len() as u64 + payload_len
}

/// Builds the `uuid` box bytes.
///
/// Compact: `[size:u32][uuid][user type][payload]`.
/// Extended: `[1:u32][uuid][size:u64][user type][payload]`.
///
/// A compact header is only written when the length fits in it; otherwise the
/// extended form is used regardless of `use_extended_size`.
pub fn build_metadata_box(use_extended_size: bool, payload: &[u8]) -> Vec<u8> {
    let payload_len = payload.len() as u64;
    let use_extended_size = use_extended_size || needs_extended_size(payload_len);
    let total = metadata_box_len(use_extended_size, payload_len);

    let mut out = Vec::with_capacity(total as usize);
    if use_extended_size {
        out.extend_from_slice(&1u32.to_be_bytes());
        out.extend_from_slice(&UUID.into_bytes());
        out.extend_from_slice(&total.to_be_bytes());
    } else {
        out.extend_from_slice(&(total as u32).to_be_bytes());
        out.extend_from_slice(&UUID.into_bytes());
    }
    out.extend_from_slice(&SPHERICAL_UUID);
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE_METADATA: &str = r#"<rdf:SphericalVideo xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <SphericalVideo>true</SphericalVideo>
  <Projection>equirectangular</Projection>
  <InitialViewHeadingDegrees>0</InitialViewHeadingDegrees>
  <InitialViewPitchDegrees>0</InitialViewPitchDegrees>
  <InitialViewRollDegrees>0</InitialViewRollDegrees>
  <stitched>true</stitched>
  <stitching_software>360VideoConverter</stitching_software>
  <stereo_mode>mono</stereo_mode>
  <source_count>1</source_count>
</rdf:SphericalVideo>"#;

    #[test]
    fn test_uuid_constant() {
        assert_eq!(
            SPHERICAL_UUID,
            [
                0xFF, 0xE4, 0x81, 0x84, 0xAB, 0xA1, 0xD6, 0x46, 0x24, 0xD8, 0x9F, 0xBD, 0xBA,
                0xA2, 0x43, 0xF7
            ]
        );
    }

    #[test]
    fn test_payload_matches_reference() {
        assert_eq!(SPHERICAL_METADATA, REFERENCE_METADATA.as_bytes());
        assert_eq!(SPHERICAL_METADATA.len(), 504);
        assert!(!SPHERICAL_METADATA.ends_with(b"\n"));
    }

    #[test]
    fn test_compact_layout() {
        let bytes = build_metadata_box(false, SPHERICAL_METADATA);
        assert_eq!(bytes.len(), 8 + 16 + 504);
        assert_eq!(&bytes[0..4], &528u32.to_be_bytes());
        assert_eq!(&bytes[4..8], b"uuid");
        assert_eq!(&bytes[8..24], &SPHERICAL_UUID);
        assert_eq!(&bytes[24..], SPHERICAL_METADATA);
    }

    #[test]
    fn test_extended_layout() {
        let bytes = build_metadata_box(true, SPHERICAL_METADATA);
        assert_eq!(bytes.len(), 16 + 16 + 504);
        assert_eq!(&bytes[0..4], &1u32.to_be_bytes());
        assert_eq!(&bytes[4..8], b"uuid");
        assert_eq!(&bytes[8..16], &536u64.to_be_bytes());
        assert_eq!(&bytes[16..32], &SPHERICAL_UUID);
        assert_eq!(&bytes[32..], SPHERICAL_METADATA);
    }

    #[test]
    fn test_box_len_matches_built_box() {
        for extended in [false, true] {
            let bytes = build_metadata_box(extended, b"abc");
            assert_eq!(bytes.len() as u64, metadata_box_len(extended, 3));
        }
    }
}
