//! The job manifest read by the scheduler

use crate::request::{InferenceRequest, Location};
use crate::types::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Contents of `job_description.json`
///
/// Field names are read by the scheduler and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub start_locations: Vec<Location>,
    pub end_locations: Vec<Location>,
    pub actions: Vec<String>,
    pub submitted_time: DateTime<Local>,
    pub scene_name: String,
}

impl JobDescriptor {
    pub fn new(request: &InferenceRequest, submitted_time: DateTime<Local>) -> Self {
        Self {
            start_locations: request.start_locations().to_vec(),
            end_locations: request.end_locations().to_vec(),
            actions: request.actions().to_vec(),
            submitted_time,
            scene_name: request.scene_name().to_string(),
        }
    }

    /// Descriptor of a submitted request, `None` while it is unsubmitted
    pub fn from_request(request: &InferenceRequest) -> Option<Self> {
        request
            .submitted_time()
            .map(|time| Self::new(request, time))
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn segment_count(&self) -> usize {
        self.actions.len()
    }
}
