//! Request consistency checks run before any staging I/O

use crate::request::{scene_name_for, InferenceRequest};
use crate::types::{ValidationError, Violation};
use std::fs;

/// Checks an [`InferenceRequest`] and reports every problem found
///
/// Only filesystem metadata is consulted; scene contents are never read.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestValidator;

impl RequestValidator {
    pub fn new() -> Self {
        Self
    }

    /// Collect all violations, in check order
    pub fn violations(&self, request: &InferenceRequest) -> Vec<Violation> {
        let mut violations = Vec::new();

        let lengths = [
            ("start_locations", request.start_locations().len()),
            ("end_locations", request.end_locations().len()),
            ("actions", request.actions().len()),
        ];

        if lengths.iter().any(|(_, len)| *len != lengths[0].1) {
            violations.push(Violation::LengthMismatch {
                start_locations: lengths[0].1,
                end_locations: lengths[1].1,
                actions: lengths[2].1,
            });
        }

        let missing: Vec<&'static str> = lengths
            .iter()
            .filter(|(_, len)| *len == 0)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            violations.push(Violation::Missing(missing));
        }

        let path = request.scene_path();
        match fs::metadata(path) {
            Err(_) => violations.push(Violation::SceneNotFound(path.to_path_buf())),
            Ok(meta) if !meta.is_file() => {
                violations.push(Violation::SceneNotAFile(path.to_path_buf()))
            }
            Ok(_) => {
                let expected = scene_name_for(path);
                if request.scene_name() != expected {
                    violations.push(Violation::SceneNameMismatch {
                        expected,
                        found: request.scene_name().to_string(),
                    });
                }
            }
        }

        violations
    }

    pub fn validate(&self, request: &InferenceRequest) -> Result<(), ValidationError> {
        let violations = self.violations(request);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    /// Like [`validate`](Self::validate), logging the message instead of returning it
    pub fn is_valid(&self, request: &InferenceRequest) -> bool {
        match self.validate(request) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("{err}");
                false
            }
        }
    }
}
