//! Labels and label sets.
//!
//! A [`Label`] maps a voxel value to a display name, a color and a `locked`
//! flag. Locked labels must never be overwritten by automated commits. A
//! [`LabelSet`] groups the labels of one segmentation layer and tracks the
//! active label.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxsegError};

/// The voxel value type stored in label volumes.
pub type LabelValue = u16;

/// The voxel value representing unlabeled background.
pub const BACKGROUND_VALUE: LabelValue = 0;

/// One label of a segmentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    value: LabelValue,
    name: String,
    color: Vec3,
    locked: bool,
    visible: bool,
}

impl Label {
    /// Creates a new unlocked, visible label.
    pub fn new(value: LabelValue, name: impl Into<String>, color: Vec3) -> Self {
        Self {
            value,
            name: name.into(),
            color,
            locked: false,
            visible: true,
        }
    }

    /// Returns the pixel value of this label.
    #[must_use]
    pub fn value(&self) -> LabelValue {
        self.value
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the display color.
    #[must_use]
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Sets the display color.
    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    /// Returns whether this label is protected from automated overwrites.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Sets the locked flag.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Returns whether this label is shown by display layers.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Sets the visible flag.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Returns a copy of this label carrying a different pixel value.
    #[must_use]
    pub fn with_value(&self, value: LabelValue) -> Label {
        let mut label = self.clone();
        label.value = value;
        label
    }
}

/// The labels of one segmentation layer, ordered by insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelSet {
    labels: Vec<Label>,
    active: Option<LabelValue>,
}

impl LabelSet {
    /// Creates an empty label set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a label.
    ///
    /// Returns an error if a label with the same value already exists. The
    /// first inserted label becomes active.
    pub fn insert(&mut self, label: Label) -> Result<()> {
        if self.contains(label.value()) {
            return Err(VoxsegError::LabelExists(label.value()));
        }
        if self.active.is_none() {
            self.active = Some(label.value());
        }
        self.labels.push(label);
        Ok(())
    }

    /// Removes a label by value.
    ///
    /// Clears the active label if it was removed.
    pub fn remove(&mut self, value: LabelValue) -> Option<Label> {
        let idx = self.labels.iter().position(|l| l.value() == value)?;
        if self.active == Some(value) {
            self.active = None;
        }
        Some(self.labels.remove(idx))
    }

    /// Returns the label with the given value.
    #[must_use]
    pub fn get(&self, value: LabelValue) -> Option<&Label> {
        self.labels.iter().find(|l| l.value() == value)
    }

    /// Returns the label with the given value, mutably.
    pub fn get_mut(&mut self, value: LabelValue) -> Option<&mut Label> {
        self.labels.iter_mut().find(|l| l.value() == value)
    }

    /// Returns true if a label with the given value exists.
    #[must_use]
    pub fn contains(&self, value: LabelValue) -> bool {
        self.labels.iter().any(|l| l.value() == value)
    }

    /// Returns the active label.
    #[must_use]
    pub fn active_label(&self) -> Option<&Label> {
        self.active.and_then(|v| self.get(v))
    }

    /// Returns the value of the active label.
    #[must_use]
    pub fn active_value(&self) -> Option<LabelValue> {
        self.active
    }

    /// Sets the active label.
    ///
    /// Returns an error if no label with the given value exists.
    pub fn set_active(&mut self, value: LabelValue) -> Result<()> {
        if !self.contains(value) {
            return Err(VoxsegError::InvalidState(format!(
                "cannot activate missing label {value}"
            )));
        }
        self.active = Some(value);
        Ok(())
    }

    /// Returns the smallest unused non-background value.
    #[must_use]
    pub fn next_free_value(&self) -> LabelValue {
        self.labels
            .iter()
            .map(Label::value)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Returns an iterator over the labels in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    /// Returns an iterator over the label values.
    pub fn values(&self) -> impl Iterator<Item = LabelValue> + '_ {
        self.labels.iter().map(Label::value)
    }

    /// Returns the values of all locked labels.
    pub fn locked_values(&self) -> impl Iterator<Item = LabelValue> + '_ {
        self.labels
            .iter()
            .filter(|l| l.is_locked())
            .map(Label::value)
    }

    /// Returns the number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if the set holds no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Serializes the label set to a JSON string, for label presets.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restores a label set from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
