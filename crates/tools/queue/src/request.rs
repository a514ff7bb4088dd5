//! Inference requests handed over by the producing front-end

use crate::types::RequestError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A single coordinate sequence
pub type Location = Vec<f64>;

/// Whether a request has been submitted to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Submission {
    #[default]
    Unsubmitted,
    Submitted { at: DateTime<Local> },
}

impl Submission {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Submission::Submitted { .. })
    }

    pub fn time(&self) -> Option<DateTime<Local>> {
        match self {
            Submission::Unsubmitted => None,
            Submission::Submitted { at } => Some(*at),
        }
    }
}

/// Scene name derived from a scene path: the file name without extension
pub fn scene_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A motion-planning request: one start location, end location and action per segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RequestDocument", into = "RequestDocument")]
pub struct InferenceRequest {
    start_locations: Vec<Location>,
    end_locations: Vec<Location>,
    actions: Vec<String>,
    scene_path: PathBuf,
    scene_name: String,
    submission: Submission,
}

impl InferenceRequest {
    pub fn new(
        start_locations: Vec<Location>,
        end_locations: Vec<Location>,
        actions: Vec<String>,
        scene_path: impl Into<PathBuf>,
    ) -> Self {
        let scene_path = scene_path.into();
        let scene_name = scene_name_for(&scene_path);
        Self {
            start_locations,
            end_locations,
            actions,
            scene_path,
            scene_name,
            submission: Submission::Unsubmitted,
        }
    }

    /// Empty request for the given scene, filled segment by segment
    pub fn for_scene(scene_path: impl Into<PathBuf>) -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), scene_path)
    }

    /// Append one segment
    pub fn push_segment(&mut self, start: Location, end: Location, action: impl Into<String>) {
        self.start_locations.push(start);
        self.end_locations.push(end);
        self.actions.push(action.into());
    }

    pub fn start_locations(&self) -> &[Location] {
        &self.start_locations
    }

    pub fn end_locations(&self) -> &[Location] {
        &self.end_locations
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn scene_path(&self) -> &Path {
        &self.scene_path
    }

    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    /// Point the request at a different scene file, recomputing the scene name
    pub fn set_scene_path(&mut self, path: impl Into<PathBuf>) {
        self.scene_path = path.into();
        self.scene_name = scene_name_for(&self.scene_path);
    }

    pub fn submission(&self) -> Submission {
        self.submission
    }

    pub fn is_submitted(&self) -> bool {
        self.submission.is_submitted()
    }

    pub fn submitted_time(&self) -> Option<DateTime<Local>> {
        self.submission.time()
    }

    /// Mark the request submitted now; returns the effective submission time
    pub fn mark_submitted(&mut self) -> DateTime<Local> {
        self.mark_submitted_at(Local::now())
    }

    /// Mark the request submitted at `time`
    ///
    /// A request that is already submitted keeps its original time; the call
    /// only logs a warning.
    pub fn mark_submitted_at(&mut self, time: DateTime<Local>) -> DateTime<Local> {
        match self.submission {
            Submission::Submitted { at } => {
                tracing::warn!(
                    "Request for '{}' already submitted at {}, keeping original time",
                    self.scene_name,
                    at.to_rfc3339()
                );
                at
            }
            Submission::Unsubmitted => {
                self.submission = Submission::Submitted { at: time };
                time
            }
        }
    }

    /// Read a request document from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Write the request document as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RequestError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

/// Wire form of a request, as exchanged with the front-end
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RequestDocument {
    #[serde(default)]
    start_locations: Vec<Location>,
    #[serde(default)]
    end_locations: Vec<Location>,
    #[serde(default)]
    actions: Vec<String>,
    scene_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scene_name: Option<String>,
    #[serde(default)]
    submitted: bool,
    #[serde(default)]
    submitted_time: Option<DateTime<Local>>,
}

impl TryFrom<RequestDocument> for InferenceRequest {
    type Error = RequestError;

    fn try_from(doc: RequestDocument) -> Result<Self, Self::Error> {
        let submission = match (doc.submitted, doc.submitted_time) {
            (false, None) => Submission::Unsubmitted,
            (true, Some(at)) => Submission::Submitted { at },
            (true, None) => return Err(RequestError::SubmittedWithoutTime),
            (false, Some(_)) => return Err(RequestError::TimeWithoutSubmitted),
        };
        let scene_name = doc
            .scene_name
            .unwrap_or_else(|| scene_name_for(&doc.scene_path));

        Ok(Self {
            start_locations: doc.start_locations,
            end_locations: doc.end_locations,
            actions: doc.actions,
            scene_path: doc.scene_path,
            scene_name,
            submission,
        })
    }
}

impl From<InferenceRequest> for RequestDocument {
    fn from(request: InferenceRequest) -> Self {
        Self {
            start_locations: request.start_locations,
            end_locations: request.end_locations,
            actions: request.actions,
            scene_path: request.scene_path,
            scene_name: Some(request.scene_name),
            submitted: request.submission.is_submitted(),
            submitted_time: request.submission.time(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> InferenceRequest {
        InferenceRequest::new(
            vec![vec![0.0, 0.0, 0.0]],
            vec![vec![1.0, 0.0, 2.0]],
            vec!["walk to the sofa".to_string()],
            "scenes/livingroom.obj",
        )
    }

    #[test]
    fn test_scene_name_is_file_stem() {
        assert_eq!(request().scene_name(), "livingroom");
        assert_eq!(scene_name_for(Path::new("/a/b/kitchen.v2.obj")), "kitchen.v2");
        assert_eq!(scene_name_for(Path::new("")), "");
    }

    #[test]
    fn test_set_scene_path_recomputes_name() {
        let mut req = request();
        req.set_scene_path("other/bedroom.obj");
        assert_eq!(req.scene_name(), "bedroom");
        assert_eq!(req.scene_path(), Path::new("other/bedroom.obj"));
    }

    #[test]
    fn test_mark_submitted_keeps_first_time() {
        let mut req = request();
        assert!(!req.is_submitted());

        let first = Local.with_ymd_and_hms(2025, 1, 22, 14, 24, 0).unwrap();
        let later = Local.with_ymd_and_hms(2025, 1, 23, 9, 0, 0).unwrap();
        assert_eq!(req.mark_submitted_at(first), first);
        assert_eq!(req.mark_submitted_at(later), first);
        assert_eq!(req.submitted_time(), Some(first));
    }

    #[test]
    fn test_push_segment_keeps_sequences_aligned() {
        let mut req = InferenceRequest::for_scene("livingroom.obj");
        req.push_segment(vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0], "sit down");
        req.push_segment(vec![1.0, 1.0, 1.0], vec![2.0, 0.0, 2.0], "stand up");
        assert_eq!(req.start_locations().len(), 2);
        assert_eq!(req.end_locations().len(), 2);
        assert_eq!(req.actions(), ["sit down", "stand up"]);
    }

    #[test]
    fn test_document_roundtrip_preserves_submission() {
        let mut req = request();
        req.mark_submitted();
        let json = serde_json::to_string(&req).unwrap();
        let back: InferenceRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn test_document_without_scene_name_derives_it() {
        let json = r#"{
            "start_locations": [[0, 0, 0]],
            "end_locations": [[1, 0, 1]],
            "actions": ["wave"],
            "scene_path": "rooms/office.obj"
        }"#;
        let req: InferenceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.scene_name(), "office");
        assert_eq!(req.submission(), Submission::Unsubmitted);
    }

    #[test]
    fn test_document_rejects_inconsistent_submission() {
        let marked = r#"{"scene_path": "a.obj", "submitted": true}"#;
        let err = serde_json::from_str::<InferenceRequest>(marked).unwrap_err();
        assert!(err.to_string().contains("no submitted_time"));

        let timed = r#"{"scene_path": "a.obj", "submitted_time": "2025-01-22T14:24:00+00:00"}"#;
        let err = serde_json::from_str::<InferenceRequest>(timed).unwrap_err();
        assert!(err.to_string().contains("not marked submitted"));
    }
}
