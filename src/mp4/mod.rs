pub mod error;
pub mod fourcc;
pub mod planner;
pub mod rewriter;
pub mod scanner;
pub mod spherical;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::InjectError;
pub use fourcc::FourCC;
pub use planner::{MetadataBoxPlan, find_spherical_marker, plan_injection};
pub use rewriter::{COPY_CHUNK_SIZE, splice};
pub use scanner::{BoxRecord, BoxScanner, HeaderWidth, scan_boxes};
pub use spherical::{SPHERICAL_METADATA, SPHERICAL_UUID, build_metadata_box};

use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of one successful injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InjectionReport {
    pub input_len: u64,
    pub output_len: u64,
    pub insertion_offset: u64,
    pub inserted_len: u64,
    pub extended_size: bool,
    pub box_count: usize,
}

/// A validated plan plus the box bytes it will insert.
struct PreparedInjection {
    plan: MetadataBoxPlan,
    metadata_box: Vec<u8>,
    box_count: usize,
}

/// Scans and plans without writing anything.
fn prepare<R: Read + Seek>(input: &mut R, input_len: u64) -> Result<PreparedInjection, InjectError> {
    let records = scan_boxes(&mut *input, input_len)?;
    if let Some(marker) = find_spherical_marker(&records) {
        return Err(InjectError::AlreadySpherical {
            offset: marker.header_offset,
        });
    }

    let plan = plan_injection(&records, SPHERICAL_METADATA.len() as u64);
    if plan.media_data_count > 1 {
        warn!(
            media_data_count = plan.media_data_count,
            "Multiple top-level mdat boxes, anchoring on the first one"
        );
    }
    debug!(?plan, box_count = records.len(), "Planned metadata injection");

    Ok(PreparedInjection {
        plan,
        metadata_box: build_metadata_box(plan.use_extended_size, SPHERICAL_METADATA),
        box_count: records.len(),
    })
}

impl PreparedInjection {
    fn write_to<R, W>(
        self,
        input: &mut R,
        input_len: u64,
        output: &mut W,
        cancel: &CancellationToken,
    ) -> Result<InjectionReport, InjectError>
    where
        R: Read + Seek,
        W: Write,
    {
        let output_len = splice(
            input,
            input_len,
            self.plan.insertion_offset,
            &self.metadata_box,
            output,
            cancel,
        )?;

        Ok(InjectionReport {
            input_len,
            output_len,
            insertion_offset: self.plan.insertion_offset,
            inserted_len: self.metadata_box.len() as u64,
            extended_size: self.plan.use_extended_size,
            box_count: self.box_count,
        })
    }
}

/// Scans `input`, plans the insertion and writes the spliced stream to `output`.
///
/// Nothing is written to `output` unless the input scans cleanly and carries
/// no spherical marker yet.
pub fn inject_into<R, W>(
    input: &mut R,
    input_len: u64,
    output: &mut W,
    cancel: &CancellationToken,
) -> Result<InjectionReport, InjectError>
where
    R: Read + Seek,
    W: Write,
{
    prepare(input, input_len)?.write_to(input, input_len, output, cancel)
}

/// File-to-file variant of [`inject_into`]. The output file is only created
/// once the input has been scanned and planned successfully.
pub fn inject_spherical_metadata(
    input_path: &Path,
    output_path: &Path,
    cancel: &CancellationToken,
) -> Result<InjectionReport, InjectError> {
    let mut input = File::open(input_path)?;
    let input_len = input.metadata()?.len();
    let prepared = prepare(&mut input, input_len)?;

    let mut output = BufWriter::with_capacity(COPY_CHUNK_SIZE, File::create(output_path)?);
    let report = prepared.write_to(&mut input, input_len, &mut output, cancel)?;
    output.into_inner().map_err(|error| error.into_error())?;
    Ok(report)
}
