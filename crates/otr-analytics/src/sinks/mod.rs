//! Sink construction.
//!
//! Turns the `[analytics]` and `[file]` configuration sections into a ready
//! [`EventSink`] and a tagger wired to it.

pub mod file;

use std::sync::Arc;

use otr_events::{Analytics, EventSink, FanoutSink, MemorySink, NullSink, TracingSink};

use crate::config::{Config, SinkKind};

pub use file::{read_events, JsonLinesSink};

/// Builds the sink selected by `config`.
///
/// With `echo` enabled, events also go to the tracing log unless the
/// selected sink already is the tracing sink.
pub fn build_sink(config: &Config) -> Arc<dyn EventSink> {
    let primary: Arc<dyn EventSink> = match config.analytics.sink {
        SinkKind::File => Arc::new(JsonLinesSink::new(&config.file.path)),
        SinkKind::Tracing => Arc::new(TracingSink),
        SinkKind::Memory => Arc::new(MemorySink::new()),
        SinkKind::Null => Arc::new(NullSink),
    };

    if config.analytics.echo && config.analytics.sink != SinkKind::Tracing {
        Arc::new(
            FanoutSink::new()
                .with_sink(primary)
                .with_sink(Arc::new(TracingSink)),
        )
    } else {
        primary
    }
}

/// Builds a tagger forwarding to the configured sink.
pub fn build_analytics(config: &Config) -> Analytics {
    let analytics = Analytics::new(build_sink(config));
    analytics.set_enabled(config.analytics.enabled);
    tracing::debug!(
        "Analytics ready (sink: {:?}, enabled: {})",
        config.analytics.sink,
        config.analytics.enabled
    );
    analytics
}

#[cfg(test)]
mod tests {
    use super::*;
    use otr_events::DeviceTrustEvents;
    use tempfile::TempDir;

    fn file_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.file.path = temp_dir.path().join("events.jsonl");
        config
    }

    #[test]
    fn test_build_file_sink() {
        let temp_dir = TempDir::new().unwrap();
        let config = file_config(&temp_dir);

        let analytics = build_analytics(&config);
        analytics.tag_delete_device();
        analytics.flush();

        assert_eq!(read_events(&config.file.path).unwrap().len(), 1);
    }

    #[test]
    fn test_build_with_echo_still_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = file_config(&temp_dir);
        config.analytics.echo = true;

        let analytics = build_analytics(&config);
        analytics.tag_self_device_list();

        assert_eq!(read_events(&config.file.path).unwrap().len(), 1);
        assert_eq!(analytics.stats().emitted, 1);
    }

    #[test]
    fn test_build_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = file_config(&temp_dir);
        config.analytics.enabled = false;

        let analytics = build_analytics(&config);
        analytics.tag_other_device_list();

        assert!(!analytics.is_enabled());
        assert!(!config.file.path.exists());
        assert_eq!(analytics.stats().suppressed, 1);
    }

    #[test]
    fn test_build_non_file_sinks() {
        for kind in [SinkKind::Tracing, SinkKind::Memory, SinkKind::Null] {
            let mut config = Config::default();
            config.analytics.sink = kind;

            let analytics = build_analytics(&config);
            analytics.tag_conversation_is_verified();
            assert_eq!(analytics.stats().emitted, 1, "{:?}", kind);
        }
    }
}
