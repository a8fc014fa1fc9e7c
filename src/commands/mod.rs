use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::display::Display;
use crate::logging::{Message, Stdout, Verbosity};
use crate::sync::aggregation::SalesVolumes;
use crate::sync::RunReport;

pub mod history;
pub mod orders;
pub mod volumes;

impl Message for RunReport {
    fn standard(&self, verbosity: Verbosity) -> ColoredString {
        let elapsed = chrono::Duration::from_std(self.elapsed)
            .map(|d| d.to_display())
            .unwrap_or_default();
        let mut out = format!(
            "{} sync of region {} ({})\n",
            self.kind.to_string().bold(),
            self.region_id,
            elapsed
        );
        out += &format!(
            "\t{:>16} {}\n\t{:>16} {}\n\t{:>16} {}\n",
            "Succeeded:",
            self.succeeded.len().to_display().green(),
            "Failed:",
            if self.failed.is_empty() {
                "0".normal()
            } else {
                self.failed.len().to_display().red()
            },
            "Cached:",
            self.skipped_by_cache.len().to_display()
        );
        if !self.not_dispatched.is_empty() {
            out += &format!(
                "\t{:>16} {}\n",
                "Not dispatched:",
                self.not_dispatched.len().to_display().yellow()
            );
        }
        out += &format!(
            "\t{:>16} {} inserted, {} updated, {} unchanged, {} skipped, {} malformed\n",
            "Records:",
            self.records.inserted.to_display(),
            self.records.updated.to_display(),
            self.records.unchanged.to_display(),
            self.records.skipped.to_display(),
            self.records.malformed.to_display()
        );
        for failure in &self.failed {
            out += &format!(
                "\t{:>16} {}\n",
                format!("[{}]", failure.item_id).red(),
                if verbosity == Verbosity::Quiet {
                    failure.stage.to_string()
                } else {
                    failure.reason.clone()
                }
            );
        }
        ColoredString::from(out.trim_end())
    }
}

impl Stdout for RunReport {}

#[derive(Serialize)]
pub struct VolumesStdout {
    volumes: Vec<SalesVolumes>,
}

impl VolumesStdout {
    pub fn new(volumes: Vec<SalesVolumes>) -> Self {
        Self { volumes }
    }
}

impl Message for VolumesStdout {
    fn standard(&self, _: Verbosity) -> ColoredString {
        if self.volumes.is_empty() {
            return ColoredString::from("");
        }
        let mut out = format!(
            "{:>12}{:>16}{:>16}{:>14}\n",
            "Item", "30 days", "60 days", "Last day"
        );
        for volumes in &self.volumes {
            out += &format!(
                "{:>12}{:>16}{:>16}{:>14}\n",
                volumes.item_id.to_string().bold(),
                volumes.average_30_days.to_display(),
                volumes.average_60_days.to_display(),
                volumes
                    .latest_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
        ColoredString::from(out.trim_end())
    }
}

impl Stdout for VolumesStdout {}
