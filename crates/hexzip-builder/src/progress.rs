// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Build progress and ETA tracking

use std::collections::VecDeque;
use std::time::Duration;

/// Build stage tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// Not started
    Initialization,
    /// Registering ZCTAs, regions and the ZIP crosswalk
    Loading,
    /// Converting geometries into raw cell claims
    Rasterization,
    /// Settling cells claimed by several ZCTAs
    DuplicateResolution,
    /// Giving cells to ZCTAs that own none
    OrphanResolution,
    /// Final consistency check
    Validation,
    Completed,
    Failed,
}

/// Build progress information
#[derive(Debug, Clone)]
pub struct BuildProgress {
    pub stage: BuildStage,
    /// Progress percentage within current stage (0-100)
    pub progress: u8,
    pub geometries_total: usize,
    pub geometries_processed: usize,
    pub batches_committed: usize,
    pub cells_claimed: usize,
    /// Estimated time left in the rasterization stage
    pub eta: Option<Duration>,
    pub duration_ms: u64,
}

impl Default for BuildProgress {
    fn default() -> Self {
        Self {
            stage: BuildStage::Initialization,
            progress: 0,
            geometries_total: 0,
            geometries_processed: 0,
            batches_committed: 0,
            cells_claimed: 0,
            eta: None,
            duration_ms: 0,
        }
    }
}

/// Rolling-window rate estimate over the most recent batches
#[derive(Debug, Clone)]
pub struct EtaEstimator {
    window: usize,
    /// (items, elapsed) per batch
    samples: VecDeque<(usize, Duration)>,
}

impl EtaEstimator {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: VecDeque::with_capacity(window.max(1)),
        }
    }

    pub fn record(&mut self, items: usize, elapsed: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back((items, elapsed));
    }

    /// Items per second across the window
    pub fn rate(&self) -> Option<f64> {
        let items: usize = self.samples.iter().map(|(n, _)| n).sum();
        let secs: f64 = self.samples.iter().map(|(_, d)| d.as_secs_f64()).sum();
        if items == 0 || secs <= 0.0 {
            None
        } else {
            Some(items as f64 / secs)
        }
    }

    pub fn eta(&self, remaining: usize) -> Option<Duration> {
        if remaining == 0 {
            return Some(Duration::ZERO);
        }
        self.rate()
            .map(|rate| Duration::from_secs_f64(remaining as f64 / rate))
    }
}

/// `1h 02m 03s` style formatting
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eta_uses_recent_window() {
        let mut eta = EtaEstimator::new(2);
        eta.record(10, Duration::from_secs(100));
        eta.record(10, Duration::from_secs(1));
        eta.record(10, Duration::from_secs(1));
        // The slow first batch fell out of the window
        assert_eq!(eta.rate(), Some(10.0));
        assert_eq!(eta.eta(50), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_eta_without_samples() {
        let eta = EtaEstimator::new(5);
        assert_eq!(eta.eta(10), None);
        assert_eq!(eta.eta(0), Some(Duration::ZERO));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 05s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h 02m 03s");
    }
}
