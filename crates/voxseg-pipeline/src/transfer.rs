//! Per-voxel commit rules.
//!
//! A commit copies a preview frame into the target label volume under a
//! label mapping of (source, destination) pairs. Destination voxels holding
//! a locked label are never written, whatever the preview proposes.

use std::collections::HashSet;

use glam::UVec3;
use serde::{Deserialize, Serialize};

use voxseg_core::error::{Result, VoxsegError};
use voxseg_core::label::{LabelSet, LabelValue, BACKGROUND_VALUE};
use voxseg_core::volume::{LabelFrame, LabelVolume};

/// How preview content combines with existing target content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeStyle {
    /// Additive: only voxels matching a mapped source label are written.
    Merge,
    /// Source content wins: additionally restores background where the
    /// target held a mapped destination label the preview no longer claims.
    #[default]
    Replace,
}

/// Mapping of preview label values to destination label values, applied per
/// voxel during commit.
pub type LabelMapping = Vec<(LabelValue, LabelValue)>;

/// Clones destination labels missing from the target label set out of the
/// preview's label set.
///
/// Background pairs are skipped. Fails if a mapped source label is absent
/// from the preview label set.
pub fn ensure_mapped_labels(
    mapping: &LabelMapping,
    source_labels: &LabelSet,
    target_labels: &mut LabelSet,
) -> Result<()> {
    for &(source, destination) in mapping {
        if source == BACKGROUND_VALUE || destination == BACKGROUND_VALUE {
            continue;
        }
        if target_labels.contains(destination) {
            continue;
        }
        let label = source_labels.get(source).ok_or_else(|| {
            VoxsegError::InvalidState(format!(
                "preview is missing mapped label {source}, cannot prepare transfer"
            ))
        })?;
        target_labels.insert(label.with_value(destination))?;
    }
    Ok(())
}

/// Copies one preview frame into one time step of the target volume.
///
/// The frame may be an ROI sub-window of the target; it is written at the
/// matching index offset. Locked target labels are skipped silently.
pub fn transfer_frame(
    source: &LabelFrame,
    target: &mut LabelVolume,
    time_step: usize,
    mapping: &LabelMapping,
    merge_style: MergeStyle,
) -> Result<()> {
    let offset = target
        .geometry()
        .index_offset_of(source.geometry())
        .ok_or_else(|| {
            VoxsegError::GeometryMismatch(
                "preview frame is not a sub-window of the commit target".into(),
            )
        })?;

    let locked: HashSet<LabelValue> = target.labels().locked_values().collect();
    let destinations: HashSet<LabelValue> = mapping
        .iter()
        .map(|&(_, destination)| destination)
        .filter(|&destination| destination != BACKGROUND_VALUE)
        .collect();

    let target_geometry = *target.geometry();
    let source_geometry = *source.geometry();
    let voxels = target
        .frame_mut(time_step)
        .ok_or_else(|| VoxsegError::InvalidState(format!("target has no time step {time_step}")))?;

    let dims = source_geometry.dims();
    for k in 0..dims.z {
        for j in 0..dims.y {
            let source_row = source_geometry.flatten_index(UVec3::new(0, j, k));
            let target_row = target_geometry.flatten_index(offset + UVec3::new(0, j, k));
            for i in 0..dims.x as usize {
                let source_value = source.voxels()[source_row + i];
                let target_value = &mut voxels[target_row + i];
                if locked.contains(target_value) {
                    continue;
                }
                let mapped = (source_value != BACKGROUND_VALUE)
                    .then(|| {
                        mapping
                            .iter()
                            .find(|&&(s, _)| s == source_value)
                            .map(|&(_, d)| d)
                    })
                    .flatten();
                match mapped {
                    Some(destination) => *target_value = destination,
                    None => {
                        if merge_style == MergeStyle::Replace
                            && destinations.contains(target_value)
                        {
                            *target_value = BACKGROUND_VALUE;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
