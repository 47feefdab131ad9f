//! Spatial and temporal layout of voxel volumes.

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Tolerance used when comparing world-space layouts of two volumes.
pub const GEOMETRY_TOLERANCE: f32 = 1e-4;

/// Spatial layout of a regular voxel grid: dimensions, world origin of the
/// first voxel, and voxel spacing along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeGeometry {
    dims: UVec3,
    origin: Vec3,
    spacing: Vec3,
}

impl VolumeGeometry {
    /// Creates a new geometry.
    #[must_use]
    pub fn new(dims: UVec3, origin: Vec3, spacing: Vec3) -> Self {
        Self {
            dims,
            origin,
            spacing,
        }
    }

    /// Creates a geometry at the world origin with unit spacing.
    #[must_use]
    pub fn with_dims(dims: UVec3) -> Self {
        Self::new(dims, Vec3::ZERO, Vec3::ONE)
    }

    /// Returns the voxel dimensions.
    #[must_use]
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    /// Returns the world position of voxel (0, 0, 0).
    #[must_use]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Returns the voxel spacing.
    #[must_use]
    pub fn spacing(&self) -> Vec3 {
        self.spacing
    }

    /// Returns the total number of voxels.
    #[must_use]
    pub fn num_voxels(&self) -> usize {
        self.dims.x as usize * self.dims.y as usize * self.dims.z as usize
    }

    /// Flattens a 3D voxel index to a linear buffer index.
    #[must_use]
    pub fn flatten_index(&self, index: UVec3) -> usize {
        index.x as usize
            + index.y as usize * self.dims.x as usize
            + index.z as usize * self.dims.x as usize * self.dims.y as usize
    }

    /// Unflattens a linear buffer index to a 3D voxel index.
    #[must_use]
    pub fn unflatten_index(&self, idx: usize) -> UVec3 {
        let x = idx % self.dims.x as usize;
        let y = (idx / self.dims.x as usize) % self.dims.y as usize;
        let z = idx / (self.dims.x as usize * self.dims.y as usize);
        UVec3::new(x as u32, y as u32, z as u32)
    }

    /// Returns true if the 3D index lies inside the grid.
    #[must_use]
    pub fn contains_index(&self, index: UVec3) -> bool {
        index.x < self.dims.x && index.y < self.dims.y && index.z < self.dims.z
    }

    /// Returns the world position of a voxel center.
    #[must_use]
    pub fn index_to_world(&self, index: UVec3) -> Vec3 {
        self.origin + index.as_vec3() * self.spacing
    }

    /// Returns the voxel index closest to a world position, or `None` if the
    /// position falls outside the grid.
    #[must_use]
    pub fn world_to_index(&self, position: Vec3) -> Option<UVec3> {
        let continuous = (position - self.origin) / self.spacing;
        let rounded = continuous.round();
        if rounded.min_element() < 0.0 {
            return None;
        }
        let index = UVec3::new(rounded.x as u32, rounded.y as u32, rounded.z as u32);
        self.contains_index(index).then_some(index)
    }

    /// Returns the world-space bounds of the grid.
    #[must_use]
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let max_index = (self.dims.max(UVec3::ONE) - UVec3::ONE).as_vec3();
        (self.origin, self.origin + max_index * self.spacing)
    }

    /// Returns the geometry of an ROI sub-window of this grid.
    ///
    /// The sub-geometry keeps the spacing and shifts the origin so that the
    /// cropped voxels stay at their original world positions. The ROI is
    /// clamped to the grid.
    #[must_use]
    pub fn crop(&self, roi: &Roi) -> VolumeGeometry {
        let roi = roi.clamped_to(self.dims);
        VolumeGeometry {
            dims: roi.size(),
            origin: self.index_to_world(roi.offset()),
            spacing: self.spacing,
        }
    }

    /// Returns the index offset at which `sub` sits inside this grid, or
    /// `None` if `sub` is not a spacing-aligned sub-window of this grid.
    #[must_use]
    pub fn index_offset_of(&self, sub: &VolumeGeometry) -> Option<UVec3> {
        if (self.spacing - sub.spacing).abs().max_element() > GEOMETRY_TOLERANCE {
            return None;
        }
        let continuous = (sub.origin - self.origin) / self.spacing;
        let rounded = continuous.round();
        if (continuous - rounded).abs().max_element() > GEOMETRY_TOLERANCE
            || rounded.min_element() < 0.0
        {
            return None;
        }
        let offset = UVec3::new(rounded.x as u32, rounded.y as u32, rounded.z as u32);
        let end = offset + sub.dims;
        (end.x <= self.dims.x && end.y <= self.dims.y && end.z <= self.dims.z).then_some(offset)
    }

    /// Returns true if two geometries describe the same grid up to
    /// [`GEOMETRY_TOLERANCE`].
    #[must_use]
    pub fn approx_eq(&self, other: &VolumeGeometry) -> bool {
        self.dims == other.dims
            && (self.origin - other.origin).abs().max_element() <= GEOMETRY_TOLERANCE
            && (self.spacing - other.spacing).abs().max_element() <= GEOMETRY_TOLERANCE
    }
}

/// An axis-aligned region of interest in voxel index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    offset: UVec3,
    size: UVec3,
}

impl Roi {
    /// Creates a new region of interest.
    #[must_use]
    pub fn new(offset: UVec3, size: UVec3) -> Self {
        Self { offset, size }
    }

    /// Returns the window offset.
    #[must_use]
    pub fn offset(&self) -> UVec3 {
        self.offset
    }

    /// Returns the window size.
    #[must_use]
    pub fn size(&self) -> UVec3 {
        self.size
    }

    /// Returns the exclusive end index of the window.
    #[must_use]
    pub fn end(&self) -> UVec3 {
        self.offset + self.size
    }

    /// Returns the number of voxels covered by the window.
    #[must_use]
    pub fn num_voxels(&self) -> usize {
        self.size.x as usize * self.size.y as usize * self.size.z as usize
    }

    /// Returns true if the window covers no voxels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size.min_element() == 0
    }

    /// Returns true if the 3D index lies inside the window.
    #[must_use]
    pub fn contains_index(&self, index: UVec3) -> bool {
        let end = self.end();
        index.x >= self.offset.x
            && index.y >= self.offset.y
            && index.z >= self.offset.z
            && index.x < end.x
            && index.y < end.y
            && index.z < end.z
    }

    /// Returns this window clamped to a grid of the given dimensions.
    #[must_use]
    pub fn clamped_to(&self, dims: UVec3) -> Roi {
        let offset = self.offset.min(dims);
        let size = self.size.min(dims - offset);
        Roi { offset, size }
    }
}

/// Uniform frame timing for a dynamic volume.
///
/// Frames are evenly spaced; a static volume degenerates to a single step
/// covering every time point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeGeometry {
    num_steps: usize,
    start: f64,
    step_duration: f64,
}

impl TimeGeometry {
    /// Creates a timing with `num_steps` frames of `step_duration` starting
    /// at time point `start`.
    ///
    /// `num_steps` is raised to at least 1.
    #[must_use]
    pub fn new(num_steps: usize, start: f64, step_duration: f64) -> Self {
        Self {
            num_steps: num_steps.max(1),
            start,
            step_duration,
        }
    }

    /// Creates the timing of a static (single-frame) volume.
    #[must_use]
    pub fn single_step() -> Self {
        Self::new(1, 0.0, 1.0)
    }

    /// Returns the number of time steps.
    #[must_use]
    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    /// Returns the time step covering a time point, clamped to the valid
    /// range.
    #[must_use]
    pub fn time_point_to_step(&self, time_point: f64) -> usize {
        if self.num_steps == 1 || self.step_duration <= 0.0 {
            return 0;
        }
        let step = ((time_point - self.start) / self.step_duration).floor();
        if step < 0.0 {
            0
        } else {
            (step as usize).min(self.num_steps - 1)
        }
    }

    /// Returns the starting time point of a step.
    #[must_use]
    pub fn step_to_time_point(&self, step: usize) -> f64 {
        self.start + step as f64 * self.step_duration
    }
}

impl Default for TimeGeometry {
    fn default() -> Self {
        Self::single_step()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_unflatten_roundtrip() {
        let geometry = VolumeGeometry::with_dims(UVec3::new(4, 3, 2));
        for idx in 0..geometry.num_voxels() {
            assert_eq!(geometry.flatten_index(geometry.unflatten_index(idx)), idx);
        }
    }

    #[test]
    fn test_world_index_conversion() {
        let geometry = VolumeGeometry::new(
            UVec3::new(10, 10, 10),
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.5, 0.5, 2.0),
        );
        let index = UVec3::new(2, 4, 1);
        let world = geometry.index_to_world(index);
        assert_eq!(world, Vec3::new(2.0, 4.0, 5.0));
        assert_eq!(geometry.world_to_index(world), Some(index));
        assert_eq!(geometry.world_to_index(Vec3::new(-10.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_crop_keeps_world_positions() {
        let geometry = VolumeGeometry::new(
            UVec3::new(8, 8, 8),
            Vec3::ZERO,
            Vec3::new(1.0, 1.0, 1.0),
        );
        let roi = Roi::new(UVec3::new(2, 3, 4), UVec3::new(3, 3, 2));
        let sub = geometry.crop(&roi);

        assert_eq!(sub.dims(), UVec3::new(3, 3, 2));
        assert_eq!(
            sub.index_to_world(UVec3::ZERO),
            geometry.index_to_world(roi.offset())
        );
        assert_eq!(geometry.index_offset_of(&sub), Some(roi.offset()));
    }

    #[test]
    fn test_index_offset_rejects_misaligned_windows() {
        let geometry = VolumeGeometry::with_dims(UVec3::new(8, 8, 8));
        let shifted = VolumeGeometry::new(
            UVec3::new(2, 2, 2),
            Vec3::new(0.25, 0.0, 0.0),
            Vec3::ONE,
        );
        assert_eq!(geometry.index_offset_of(&shifted), None);

        let too_large = VolumeGeometry::new(UVec3::new(8, 8, 8), Vec3::new(1.0, 0.0, 0.0), Vec3::ONE);
        assert_eq!(geometry.index_offset_of(&too_large), None);
    }

    #[test]
    fn test_roi_clamping() {
        let roi = Roi::new(UVec3::new(6, 6, 6), UVec3::new(4, 4, 4));
        let clamped = roi.clamped_to(UVec3::new(8, 8, 8));
        assert_eq!(clamped.size(), UVec3::new(2, 2, 2));
        assert_eq!(clamped.end(), UVec3::new(8, 8, 8));
    }

    #[test]
    fn test_time_point_mapping() {
        let time = TimeGeometry::new(4, 10.0, 2.0);
        assert_eq!(time.time_point_to_step(9.0), 0);
        assert_eq!(time.time_point_to_step(10.0), 0);
        assert_eq!(time.time_point_to_step(13.9), 1);
        assert_eq!(time.time_point_to_step(17.9), 3);
        assert_eq!(time.time_point_to_step(100.0), 3);
        assert_eq!(time.step_to_time_point(2), 14.0);
    }

    #[test]
    fn test_single_step_degenerates() {
        let time = TimeGeometry::single_step();
        assert_eq!(time.num_steps(), 1);
        assert_eq!(time.time_point_to_step(-5.0), 0);
        assert_eq!(time.time_point_to_step(5.0), 0);
    }
}
