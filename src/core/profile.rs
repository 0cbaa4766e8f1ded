use crate::domain::model::Stage;
use crate::utils::error::{LoadError, Result};
use std::time::Duration;

/// Ramping virtual-user profile.
///
/// Each stage moves the VU count linearly from the previous stage's target
/// (0 before the first stage) to its own target over its duration.
#[derive(Debug, Clone)]
pub struct LoadProfile {
    stages: Vec<Stage>,
}

impl LoadProfile {
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(LoadError::MissingConfigError {
                field: "stages".to_string(),
            });
        }
        if stages.iter().all(|s| s.duration.is_zero()) {
            return Err(LoadError::invalid_value(
                "stages",
                format!("{} stages", stages.len()),
                "Total profile duration must be greater than zero",
            ));
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn max_target(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Index of the stage running at `elapsed`, `None` once the profile is over.
    pub fn stage_index_at(&self, elapsed: Duration) -> Option<usize> {
        let mut stage_end = Duration::ZERO;
        for (index, stage) in self.stages.iter().enumerate() {
            stage_end += stage.duration;
            if elapsed < stage_end {
                return Some(index);
            }
        }
        None
    }

    /// Number of VUs that should be active at `elapsed`.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        let mut stage_start = Duration::ZERO;
        let mut from = 0u32;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                let progress = (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let from = f64::from(from);
                let to = f64::from(stage.target);
                return (from + (to - from) * progress).round() as u32;
            }
            stage_start = stage_end;
            from = stage.target;
        }

        from
    }
}
