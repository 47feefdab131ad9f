//! The editing session: data storage, tool table and activation lifecycle.

use voxseg_core::error::{Result, VoxsegError};
use voxseg_core::event::EventChannel;
use voxseg_core::geometry::Roi;
use voxseg_core::storage::{DataNode, DataRole, DataStorage, NodeData, NodeId};
use voxseg_core::volume::{ImageVolume, LabelVolume};
use voxseg_interaction::PointInteractionController;
use voxseg_pipeline::{PreviewComputeStrategy, PreviewConfig, PreviewPipeline};

/// Index handle into the session's tool table.
///
/// Tools never hold a pointer back to their session; the session is the
/// sole owner of tool lifetime and hands out these handles instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToolId(usize);

/// One registered tool: a seed-point controller plus a preview pipeline.
pub struct Tool {
    name: String,
    controller: PointInteractionController,
    pipeline: PreviewPipeline,
}

impl Tool {
    fn new(pipeline: PreviewPipeline) -> Self {
        Self {
            name: pipeline.name().to_string(),
            controller: PointInteractionController::new(),
            pipeline,
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the seed-point controller.
    #[must_use]
    pub fn controller(&self) -> &PointInteractionController {
        &self.controller
    }

    /// Returns the seed-point controller mutably.
    pub fn controller_mut(&mut self) -> &mut PointInteractionController {
        &mut self.controller
    }

    /// Returns the preview pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &PreviewPipeline {
        &self.pipeline
    }

    /// Returns the preview pipeline mutably.
    pub fn pipeline_mut(&mut self) -> &mut PreviewPipeline {
        &mut self.pipeline
    }
}

/// Owns the data storage and the registered tools of one editing session.
///
/// At most one tool is active at a time. Activation resets the tool's point
/// set and preview; deactivation removes the transient preview node from
/// the storage.
pub struct Session {
    storage: DataStorage,
    tools: Vec<Tool>,
    active_tool: Option<ToolId>,
    selected_time_point: f64,
    render_requests: EventChannel<()>,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: DataStorage::new(),
            tools: Vec::new(),
            active_tool: None,
            selected_time_point: 0.0,
            render_requests: EventChannel::new(),
        }
    }

    /// Returns the data storage.
    #[must_use]
    pub fn storage(&self) -> &DataStorage {
        &self.storage
    }

    /// Returns the data storage mutably.
    pub fn storage_mut(&mut self) -> &mut DataStorage {
        &mut self.storage
    }

    /// Stores a scalar volume as the session's reference data.
    pub fn add_reference_image(&mut self, image: ImageVolume) -> NodeId {
        let name = image.name().to_string();
        self.storage
            .add(DataNode::new(name, DataRole::Reference, NodeData::Image(image)))
    }

    /// Stores a label volume as the session's working segmentation.
    pub fn add_working_labels(&mut self, labels: LabelVolume) -> NodeId {
        let name = labels.name().to_string();
        self.storage
            .add(DataNode::new(name, DataRole::Working, NodeData::Labels(labels)))
    }

    /// Registers a tool with the default pipeline configuration.
    pub fn register_tool(&mut self, strategy: Box<dyn PreviewComputeStrategy>) -> ToolId {
        self.register_tool_with_config(strategy, PreviewConfig::default())
    }

    /// Registers a tool with an explicit pipeline configuration.
    pub fn register_tool_with_config(
        &mut self,
        strategy: Box<dyn PreviewComputeStrategy>,
        config: PreviewConfig,
    ) -> ToolId {
        let id = ToolId(self.tools.len());
        self.tools.push(Tool::new(PreviewPipeline::new(strategy, config)));
        id
    }

    /// Returns a registered tool.
    #[must_use]
    pub fn tool(&self, id: ToolId) -> Option<&Tool> {
        self.tools.get(id.0)
    }

    /// Returns a registered tool mutably.
    pub fn tool_mut(&mut self, id: ToolId) -> Option<&mut Tool> {
        self.tools.get_mut(id.0)
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn num_tools(&self) -> usize {
        self.tools.len()
    }

    /// Returns the handle of the active tool, if any.
    #[must_use]
    pub fn active_tool_id(&self) -> Option<ToolId> {
        self.active_tool
    }

    /// Returns the active tool, if any.
    #[must_use]
    pub fn active_tool(&self) -> Option<&Tool> {
        self.active_tool.and_then(|id| self.tools.get(id.0))
    }

    /// Returns the active tool mutably, if any.
    pub fn active_tool_mut(&mut self) -> Option<&mut Tool> {
        let id = self.active_tool?;
        self.tools.get_mut(id.0)
    }

    /// Returns the selected time point.
    #[must_use]
    pub fn selected_time_point(&self) -> f64 {
        self.selected_time_point
    }

    /// Fired after session-level mutations, requesting a redraw.
    pub fn render_request_events(&mut self) -> &mut EventChannel<()> {
        &mut self.render_requests
    }

    /// Activates a tool, deactivating the current one first. `None`
    /// deactivates without activating a successor.
    ///
    /// Activation failure (e.g. no reference data) leaves no tool active.
    pub fn activate_tool(&mut self, id: Option<ToolId>) -> Result<()> {
        if let Some(current) = self.active_tool.take() {
            if let Some(tool) = self.tools.get_mut(current.0) {
                tool.pipeline.deactivate(&mut self.storage);
                tool.controller.reset();
            }
        }

        let Some(id) = id else {
            self.render_requests.publish(&());
            return Ok(());
        };
        let tool = self
            .tools
            .get_mut(id.0)
            .ok_or_else(|| VoxsegError::InvalidState(format!("unknown tool handle {id:?}")))?;
        tool.controller.reset();
        match tool.pipeline.activate(&mut self.storage, self.selected_time_point) {
            Ok(()) => {
                self.active_tool = Some(id);
                self.render_requests.publish(&());
                Ok(())
            }
            Err(err) => {
                log::warn!("cannot activate tool '{}': {err}", tool.name);
                Err(err)
            }
        }
    }

    /// Moves the selected time point, notifying the active pipeline.
    pub fn set_selected_time_point(&mut self, time_point: f64) -> Result<()> {
        self.selected_time_point = time_point;
        if let Some(id) = self.active_tool {
            let tool = &mut self.tools[id.0];
            tool.pipeline.handle_time_point_changed(
                &self.storage,
                Some(tool.controller.point_set()),
                time_point,
            )?;
        }
        self.render_requests.publish(&());
        Ok(())
    }

    /// Sets or clears the region of interest, notifying the active
    /// pipeline.
    pub fn set_region_of_interest(&mut self, roi: Option<Roi>) -> Result<()> {
        let existing = self.storage.first_of_role(DataRole::Roi);
        match (roi, existing) {
            (Some(window), Some(node_id)) => {
                if let Some(node) = self.storage.get_mut(node_id) {
                    *node.data_mut() = NodeData::Roi(window);
                }
            }
            (Some(window), None) => {
                self.storage.add(DataNode::new(
                    "region of interest",
                    DataRole::Roi,
                    NodeData::Roi(window),
                ));
            }
            (None, Some(node_id)) => {
                self.storage.remove(node_id);
            }
            (None, None) => {}
        }

        if let Some(id) = self.active_tool {
            self.tools[id.0]
                .pipeline
                .handle_roi_changed(&self.storage, roi)?;
        }
        self.render_requests.publish(&());
        Ok(())
    }

    /// Recomputes the active tool's preview, forwarding its seed points.
    pub fn update_preview(&mut self, force_all_time_steps: bool) -> Result<()> {
        let id = self
            .active_tool
            .ok_or_else(|| VoxsegError::InvalidState("no active tool".into()))?;
        let tool = &mut self.tools[id.0];
        tool.pipeline.update_preview_with_seeds(
            &self.storage,
            Some(tool.controller.point_set()),
            force_all_time_steps,
        )
    }

    /// Discards the active tool's cached preview content.
    pub fn reset_preview(&mut self) -> Result<()> {
        let id = self
            .active_tool
            .ok_or_else(|| VoxsegError::InvalidState("no active tool".into()))?;
        self.tools[id.0].pipeline.reset_preview_node(&self.storage)
    }

    /// Commits the active tool's preview into the resolved target volume.
    ///
    /// Unless the tool is configured to stay active after accepting, the
    /// session ends up with no active tool.
    pub fn confirm_segmentation(&mut self) -> Result<()> {
        let id = self
            .active_tool
            .ok_or_else(|| VoxsegError::InvalidState("no active tool".into()))?;
        let tool = &mut self.tools[id.0];
        let result = tool
            .pipeline
            .confirm_segmentation(&mut self.storage, Some(tool.controller.point_set()));
        if !tool.pipeline.is_active() {
            tool.controller.reset();
            self.active_tool = None;
        }
        self.render_requests.publish(&());
        result
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
