//! Role-tagged data node storage.
//!
//! The storage is the application-facing registry of volumes participating
//! in an editing session. Nodes carry a role (`Reference`, `Working`, ...)
//! so collaborators can look up "the reference volume" or "the working
//! segmentation" without holding owning pointers to each other.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::geometry::Roi;
use crate::volume::{ImageVolume, LabelVolume};

/// Stable handle to a stored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

/// The role a node plays in an editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataRole {
    /// The scalar input volume the segmentation is computed from.
    Reference,
    /// The segmentation volume currently being edited.
    Working,
    /// An optional region-of-interest restriction.
    Roi,
    /// A committed segmentation result that is not the working volume.
    Segmentation,
    /// A transient display-only node (e.g. a preview overlay).
    Helper,
}

/// The payload of a data node.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// A scalar input volume.
    Image(ImageVolume),
    /// A label segmentation volume.
    Labels(LabelVolume),
    /// A region-of-interest window.
    Roi(Roi),
    /// No payload; the node only carries display properties.
    None,
}

/// Display properties attached to a node, consumed by render layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProperties {
    pub color: Vec3,
    pub opacity: f32,
    pub visible: bool,
    pub helper: bool,
}

impl Default for NodeProperties {
    fn default() -> Self {
        Self {
            color: Vec3::new(1.0, 1.0, 1.0),
            opacity: 1.0,
            visible: true,
            helper: false,
        }
    }
}

/// A named, role-tagged node.
#[derive(Debug, Clone)]
pub struct DataNode {
    name: String,
    role: DataRole,
    data: NodeData,
    properties: NodeProperties,
}

impl DataNode {
    /// Creates a node with default display properties.
    pub fn new(name: impl Into<String>, role: DataRole, data: NodeData) -> Self {
        Self {
            name: name.into(),
            role,
            data,
            properties: NodeProperties::default(),
        }
    }

    /// Returns the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the node name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the node role.
    #[must_use]
    pub fn role(&self) -> DataRole {
        self.role
    }

    /// Returns the payload.
    #[must_use]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Returns the payload mutably.
    pub fn data_mut(&mut self) -> &mut NodeData {
        &mut self.data
    }

    /// Returns the display properties.
    #[must_use]
    pub fn properties(&self) -> &NodeProperties {
        &self.properties
    }

    /// Returns the display properties mutably.
    pub fn properties_mut(&mut self) -> &mut NodeProperties {
        &mut self.properties
    }

    /// Returns the payload as an image volume, if it is one.
    #[must_use]
    pub fn as_image(&self) -> Option<&ImageVolume> {
        match &self.data {
            NodeData::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Returns the payload as an image volume mutably, if it is one.
    pub fn as_image_mut(&mut self) -> Option<&mut ImageVolume> {
        match &mut self.data {
            NodeData::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Returns the payload as a label volume, if it is one.
    #[must_use]
    pub fn as_labels(&self) -> Option<&LabelVolume> {
        match &self.data {
            NodeData::Labels(labels) => Some(labels),
            _ => None,
        }
    }

    /// Returns the payload as a label volume mutably, if it is one.
    pub fn as_labels_mut(&mut self) -> Option<&mut LabelVolume> {
        match &mut self.data {
            NodeData::Labels(labels) => Some(labels),
            _ => None,
        }
    }

    /// Returns the payload as a region of interest, if it is one.
    #[must_use]
    pub fn as_roi(&self) -> Option<&Roi> {
        match &self.data {
            NodeData::Roi(roi) => Some(roi),
            _ => None,
        }
    }
}

/// Registry of all data nodes of a session.
///
/// Iteration follows insertion order; "the first node of a role" is the
/// earliest added node still present.
#[derive(Debug, Default)]
pub struct DataStorage {
    nodes: BTreeMap<u64, DataNode>,
    next_id: u64,
}

impl DataStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its handle.
    pub fn add(&mut self, node: DataNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id.0, node);
        id
    }

    /// Removes a node.
    pub fn remove(&mut self, id: NodeId) -> Option<DataNode> {
        self.nodes.remove(&id.0)
    }

    /// Returns a node by handle.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&DataNode> {
        self.nodes.get(&id.0)
    }

    /// Returns a node by handle, mutably.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut DataNode> {
        self.nodes.get_mut(&id.0)
    }

    /// Returns true if the handle resolves to a stored node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id.0)
    }

    /// Returns the first node of the given role.
    #[must_use]
    pub fn first_of_role(&self, role: DataRole) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.role() == role)
            .map(|(id, _)| NodeId(*id))
    }

    /// Returns the handles of all nodes of the given role, in insertion
    /// order.
    pub fn nodes_of_role(&self, role: DataRole) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(move |(_, node)| node.role() == role)
            .map(|(id, _)| NodeId(*id))
    }

    /// Returns an iterator over all nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DataNode)> {
        self.nodes.iter().map(|(id, node)| (NodeId(*id), node))
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Removes all nodes.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
