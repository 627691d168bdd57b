//! Pipeline configuration.

use crate::error::{Error, Result};
use std::time::Duration;

/// Environment variable overriding [`PipelineConfig::frame_interval`], in
/// milliseconds.
pub const ENV_FRAME_INTERVAL_MS: &str = "LITEPIPE_FRAME_INTERVAL_MS";
/// Environment variable overriding [`PipelineConfig::video_decoders`].
pub const ENV_VIDEO_DECODERS: &str = "LITEPIPE_VIDEO_DECODERS";
/// Environment variable overriding [`PipelineConfig::audio_consumers`].
pub const ENV_AUDIO_CONSUMERS: &str = "LITEPIPE_AUDIO_CONSUMERS";
/// Environment variable overriding both packet queue capacities.
pub const ENV_PACKET_QUEUE_CAPACITY: &str = "LITEPIPE_PACKET_QUEUE_CAPACITY";
/// Environment variable overriding [`PipelineConfig::frame_queue_capacity`].
pub const ENV_FRAME_QUEUE_CAPACITY: &str = "LITEPIPE_FRAME_QUEUE_CAPACITY";

/// Configuration for the playback topology.
///
/// # Example
///
/// ```rust
/// use litepipe::pipeline::PipelineConfig;
/// use std::time::Duration;
///
/// let config = PipelineConfig::default()
///     .with_video_decoders(2)
///     .with_frame_interval(Duration::ZERO);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Name used in logs, spans, and metric labels.
    pub name: String,
    /// Capacity of the video packet queue.
    pub video_queue_capacity: usize,
    /// Capacity of the audio packet queue.
    pub audio_queue_capacity: usize,
    /// Capacity of the decoded frame queue.
    pub frame_queue_capacity: usize,
    /// Number of decode stages sharing the video queue.
    pub video_decoders: usize,
    /// Number of drain stages sharing the audio queue.
    pub audio_consumers: usize,
    /// Interval between presented frames. Zero disables pacing.
    pub frame_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "playback".to_string(),
            video_queue_capacity: 60,
            audio_queue_capacity: 60,
            frame_queue_capacity: 30,
            video_decoders: 1,
            audio_consumers: 1,
            frame_interval: Duration::from_millis(40), // ~25 fps
        }
    }
}

impl PipelineConfig {
    /// Small queues for minimal buffering between demux and presentation.
    pub fn low_latency() -> Self {
        Self {
            video_queue_capacity: 8,
            audio_queue_capacity: 8,
            frame_queue_capacity: 2,
            ..Self::default()
        }
    }

    /// Unpaced, with several decoders and audio consumers, for pushing as
    /// many items through the queues as possible.
    pub fn stress() -> Self {
        Self {
            name: "stress".to_string(),
            video_queue_capacity: 64,
            audio_queue_capacity: 64,
            frame_queue_capacity: 64,
            video_decoders: 4,
            audio_consumers: 4,
            frame_interval: Duration::ZERO,
        }
    }

    /// Set the pipeline name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set both packet queue capacities.
    pub fn with_packet_queue_capacity(mut self, capacity: usize) -> Self {
        self.video_queue_capacity = capacity;
        self.audio_queue_capacity = capacity;
        self
    }

    /// Set the frame queue capacity.
    pub fn with_frame_queue_capacity(mut self, capacity: usize) -> Self {
        self.frame_queue_capacity = capacity;
        self
    }

    /// Set the number of video decode stages.
    pub fn with_video_decoders(mut self, count: usize) -> Self {
        self.video_decoders = count;
        self
    }

    /// Set the number of audio drain stages.
    pub fn with_audio_consumers(mut self, count: usize) -> Self {
        self.audio_consumers = count;
        self
    }

    /// Set the frame interval.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Apply overrides from `LITEPIPE_*` environment variables.
    ///
    /// Unset variables leave the current value alone; unparsable ones are
    /// an error.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(ms) = env_value::<u64>(ENV_FRAME_INTERVAL_MS)? {
            self.frame_interval = Duration::from_millis(ms);
        }
        if let Some(count) = env_value(ENV_VIDEO_DECODERS)? {
            self.video_decoders = count;
        }
        if let Some(count) = env_value(ENV_AUDIO_CONSUMERS)? {
            self.audio_consumers = count;
        }
        if let Some(capacity) = env_value(ENV_PACKET_QUEUE_CAPACITY)? {
            self = self.with_packet_queue_capacity(capacity);
        }
        if let Some(capacity) = env_value(ENV_FRAME_QUEUE_CAPACITY)? {
            self.frame_queue_capacity = capacity;
        }
        Ok(self)
    }

    /// Check that every capacity and stage count is at least one.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("video_queue_capacity", self.video_queue_capacity),
            ("audio_queue_capacity", self.audio_queue_capacity),
            ("frame_queue_capacity", self.frame_queue_capacity),
            ("video_decoders", self.video_decoders),
            ("audio_consumers", self.audio_consumers),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be at least 1", field)));
            }
        }
        Ok(())
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidConfig(format!("{}: cannot parse '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.video_queue_capacity, 60);
        assert_eq!(config.frame_queue_capacity, 30);
        assert_eq!(config.frame_interval, Duration::from_millis(40));
        config.validate().unwrap();
    }

    #[test]
    fn test_presets_are_valid() {
        PipelineConfig::low_latency().validate().unwrap();
        let stress = PipelineConfig::stress();
        stress.validate().unwrap();
        assert!(stress.frame_interval.is_zero());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let err = PipelineConfig::default()
            .with_video_decoders(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("video_decoders"));

        assert!(matches!(
            PipelineConfig::default().with_frame_queue_capacity(0).validate(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_env_value_missing() {
        let value: Option<u64> = env_value("LITEPIPE_TEST_SURELY_UNSET_VARIABLE").unwrap();
        assert!(value.is_none());
    }
}
