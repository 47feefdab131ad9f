//! Commit target resolution.

use voxseg_core::error::{Result, VoxsegError};
use voxseg_core::storage::{DataNode, DataRole, DataStorage, NodeData, NodeId};
use voxseg_core::volume::LabelVolume;

/// Decides the destination volume of a commit: the working volume itself
/// (overwrite) or a freshly created, geometry-matched empty volume.
///
/// The created volume is memoized for the duration of the session, so
/// repeated resolves return the same node. Flipping the overwrite flag
/// redirects subsequent commits without deleting an already created volume;
/// flipping it back reuses that volume instead of allocating a second one.
#[derive(Debug)]
pub struct SegmentationTargetResolver {
    tool_name: String,
    overwrite_existing: bool,
    created: Option<NodeId>,
}

impl SegmentationTargetResolver {
    /// Creates a resolver for the named tool, defaulting to overwrite.
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            overwrite_existing: true,
            created: None,
        }
    }

    /// Returns whether commits go to the existing working volume.
    #[must_use]
    pub fn overwrite_existing(&self) -> bool {
        self.overwrite_existing
    }

    /// Sets whether commits go to the existing working volume.
    pub fn set_overwrite_existing(&mut self, overwrite: bool) {
        self.overwrite_existing = overwrite;
    }

    /// Returns the node created for this session, if any.
    #[must_use]
    pub fn created_node(&self) -> Option<NodeId> {
        self.created
    }

    /// Forgets the memoized node; called when a new session starts.
    pub fn reset_session(&mut self) {
        self.created = None;
    }

    /// Resolves the commit destination.
    ///
    /// With overwrite set, this is the first working node. Otherwise a new
    /// empty label volume named after the reference volume and the tool is
    /// created on first use and returned on every later call.
    pub fn resolve(&mut self, storage: &mut DataStorage) -> Result<NodeId> {
        if self.overwrite_existing {
            return storage
                .first_of_role(DataRole::Working)
                .ok_or(VoxsegError::MissingReferenceData);
        }

        if let Some(id) = self.created {
            if storage.contains(id) {
                return Ok(id);
            }
            // The host removed our volume; fall through and create a new one.
            self.created = None;
        }

        let reference_id = storage
            .first_of_role(DataRole::Reference)
            .ok_or(VoxsegError::MissingReferenceData)?;
        let reference = storage
            .get(reference_id)
            .ok_or(VoxsegError::NodeNotFound(reference_id))?;
        let image = reference
            .as_image()
            .ok_or(VoxsegError::MissingReferenceData)?;

        let name = format!("{} {}", reference.name(), self.tool_name);
        let volume = LabelVolume::new_empty(name.clone(), *image.geometry(), *image.time_geometry());
        let id = storage.add(DataNode::new(
            name,
            DataRole::Segmentation,
            NodeData::Labels(volume),
        ));
        log::debug!("created segmentation target node for tool '{}'", self.tool_name);
        self.created = Some(id);
        Ok(id)
    }
}
