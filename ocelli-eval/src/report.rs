//! Console summary of one evaluated test set.

use std::fmt;

use crate::metrics::ErrorStats;

const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

/// Formats the per-axis errors exactly as they are printed after scoring.
pub struct Summary<'a> {
    pub set_name: &'a str,
    pub model_mse: f32,
    pub stats: &'a ErrorStats,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Testing {} real set MSE = {:.4}", self.set_name, self.model_mse)?;
        for (axis, (mse, sem)) in self.stats.mse.iter().zip(self.stats.sem.iter()).enumerate() {
            let label = AXIS_NAMES
                .get(axis)
                .map(|s| s.to_string())
                .unwrap_or_else(|| axis.to_string());
            writeln!(
                f,
                "Testing real set. Error in {label}-axis = {mse:.4} +/- {sem:.4}"
            )?;
        }
        write!(
            f,
            "Testing real set. Total loss = {:.4} +/- {:.4}",
            self.stats.loss, self.stats.sem_loss
        )
    }
}
