use std::time::Duration;

use crate::shared::constants::DEFAULT_PATCH_SIZE;

/// How the run loop paces itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamMode {
    /// Continuous source; one tick per `StreamConfig::tick`, stopped only
    /// by the stop flag.
    Live,
    /// Finite source; ticks run unthrottled until the source is exhausted
    /// and all in-flight jobs have drained.
    Sequence,
}

#[derive(Clone, Debug)]
pub struct StreamConfig {
    pub mode: StreamMode,
    /// Tick interval for live sources; the presentation-refresh analog.
    pub tick: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            mode: StreamMode::Sequence,
            tick: Duration::from_millis(16),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LocatorConfig {
    /// Frame dimensions must tile evenly by this patch size when locating
    /// is enabled.
    pub patch_size: u32,
    /// The locator works on a half-resolution image; dimension constraints
    /// apply to the halved size.
    pub half_sample: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            half_sample: false,
        }
    }
}

/// Pipeline configuration, fixed for the lifetime of a run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Parallel decode capacity. 0 means no pool: locate+decode runs
    /// inline on the driver's own thread.
    pub num_workers: usize,
    /// When disabled, a single fixed scan band replaces the locator.
    pub locate: bool,
    pub locator: LocatorConfig,
    pub stream: StreamConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_workers: 0,
            locate: true,
            locator: LocatorConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.num_workers, 0);
        assert!(config.locate);
        assert_eq!(config.locator.patch_size, DEFAULT_PATCH_SIZE);
        assert!(!config.locator.half_sample);
        assert_eq!(config.stream.mode, StreamMode::Sequence);
    }
}
