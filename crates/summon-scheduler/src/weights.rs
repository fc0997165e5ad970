use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weight {
    pub count: u64,
    pub ema_seconds: f64,
}

/// Learned per-task elapsed times, keyed by task name. Persisted as stable
/// JSON (`<cache_dir>/scheduler-weights.json`) so the next run's critical
/// path estimate starts from reality instead of zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightTable(BTreeMap<String, Weight>);

impl WeightTable {
    pub fn load(path: &Path) -> Result<Self, SchedulerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Ok(summon_stable_json::read_from_file(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SchedulerError> {
        Ok(summon_stable_json::write_to_file(path, self)?)
    }

    /// The estimate used for scheduling: the learned EMA if one exists,
    /// otherwise the task's explicit hint, otherwise a conservative default.
    pub fn estimate(&self, task_name: &str, hint: Option<f64>) -> f64 {
        self.0
            .get(task_name)
            .map(|w| w.ema_seconds)
            .or(hint)
            .unwrap_or(0.05)
    }

    /// Smoothed average update: `(old + new) / 2`, per spec.md §4.1.
    pub fn record(&mut self, task_name: &str, elapsed_seconds: f64) {
        self.0
            .entry(task_name.to_string())
            .and_modify(|w| {
                w.count += 1;
                w.ema_seconds = (w.ema_seconds + elapsed_seconds) / 2.0;
            })
            .or_insert(Weight {
                count: 1,
                ema_seconds: elapsed_seconds,
            });
    }
}
