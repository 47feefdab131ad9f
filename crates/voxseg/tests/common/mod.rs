//! Shared fixtures for the integration tests.

// Each test binary only uses a subset of the fixtures.
#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use voxseg::*;

/// Marks every voxel whose sample falls into `[lower, upper]` with the
/// active label. Counts hook invocations and can be told to fail.
pub struct WindowThreshold {
    lower: f64,
    upper: f64,
    active_label: LabelValue,
    revision: Revision,
    calls: Rc<Cell<usize>>,
    fail: Rc<Cell<bool>>,
}

impl WindowThreshold {
    pub fn new(lower: f64, upper: f64) -> (Self, Rc<Cell<usize>>, Rc<Cell<bool>>) {
        let calls = Rc::new(Cell::new(0));
        let fail = Rc::new(Cell::new(false));
        (
            Self {
                lower,
                upper,
                active_label: 1,
                revision: Revision::now(),
                calls: calls.clone(),
                fail: fail.clone(),
            },
            calls,
            fail,
        )
    }

    pub fn set_window(&mut self, lower: f64, upper: f64) {
        self.lower = lower;
        self.upper = upper;
        self.revision.touch();
    }
}

impl PreviewComputeStrategy for WindowThreshold {
    fn name(&self) -> &str {
        "window threshold"
    }

    fn compute_preview(
        &mut self,
        input: &ScalarFrame,
        _prior: Option<&LabelFrame>,
        _time_step: usize,
    ) -> Result<LabelFrame> {
        self.calls.set(self.calls.get() + 1);
        if self.fail.get() {
            return Err(VoxsegError::AlgorithmFailure("synthetic failure".into()));
        }
        let mut frame = LabelFrame::new_empty(*input.geometry());
        for idx in 0..frame.voxels().len() {
            if let Some(sample) = input.data().sample_as_f64(idx) {
                if sample >= self.lower && sample <= self.upper {
                    frame.voxels_mut()[idx] = self.active_label;
                }
            }
        }
        Ok(frame)
    }

    fn parameter_revision(&self) -> Revision {
        self.revision
    }

    fn prepare_update(&mut self, active_label: LabelValue) {
        self.active_label = active_label;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Labels every voxel with its sample value, counting invocations. Used to
/// exercise the multi-label wrapper.
pub struct BucketPartition {
    revision: Revision,
    calls: Rc<Cell<usize>>,
}

impl BucketPartition {
    pub fn new() -> (Self, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Self {
                revision: Revision::now(),
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl MultiLabelCompute for BucketPartition {
    fn name(&self) -> &str {
        "bucket partition"
    }

    fn compute_multi_label(
        &mut self,
        input: &ScalarFrame,
        _time_step: usize,
    ) -> Result<(LabelFrame, LabelSet)> {
        self.calls.set(self.calls.get() + 1);
        let mut frame = LabelFrame::new_empty(*input.geometry());
        let mut labels = LabelSet::new();
        for idx in 0..frame.voxels().len() {
            let value = input.data().sample_as_f64(idx).unwrap_or(0.0) as LabelValue;
            frame.voxels_mut()[idx] = value;
            if value != BACKGROUND_VALUE && !labels.contains(value) {
                labels
                    .insert(Label::new(value, format!("bucket {value}"), Vec3::ONE))
                    .unwrap();
            }
        }
        Ok((frame, labels))
    }

    fn parameter_revision(&self) -> Revision {
        self.revision
    }
}

pub const DIMS: UVec3 = UVec3::new(4, 4, 1);

/// A reference image whose sample at (x, y, z) is the x coordinate, on
/// every time step.
pub fn ramp_image(num_steps: usize) -> ImageVolume {
    let geometry = VolumeGeometry::with_dims(DIMS);
    let mut samples = vec![0u8; geometry.num_voxels()];
    for (idx, sample) in samples.iter_mut().enumerate() {
        *sample = geometry.unflatten_index(idx).x as u8;
    }
    let frames = (0..num_steps)
        .map(|_| ScalarData::U8(samples.clone()))
        .collect();
    ImageVolume::from_frames(
        "ct",
        geometry,
        TimeGeometry::new(num_steps, 0.0, 1.0),
        frames,
    )
    .unwrap()
}

/// An empty working segmentation with one active "result" label.
pub fn working_labels(num_steps: usize) -> LabelVolume {
    let mut labels = LabelVolume::new_empty(
        "seg",
        VolumeGeometry::with_dims(DIMS),
        TimeGeometry::new(num_steps, 0.0, 1.0),
    );
    labels
        .labels_mut()
        .insert(Label::new(1, "result", Vec3::new(0.8, 0.2, 0.2)))
        .unwrap();
    labels
}

/// A session over a ramp image and an empty working segmentation.
pub fn session_with_data(num_steps: usize) -> Session {
    let mut session = Session::new();
    session.add_reference_image(ramp_image(num_steps));
    session.add_working_labels(working_labels(num_steps));
    session
}

/// The working volume of a session.
pub fn working_of(session: &Session) -> &LabelVolume {
    let id = session.storage().first_of_role(DataRole::Working).unwrap();
    session.storage().get(id).unwrap().as_labels().unwrap()
}
