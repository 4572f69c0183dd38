//! `tracing-subscriber` backend with a reloadable logger graph.
//!
//! # Responsibilities
//! - Hold the live `LoggerGraph` and swap it atomically
//! - Keep the level filter in step with the graph via a reload handle
//! - Route each formatted event to the appenders of its logger
//!
//! # Design Decisions
//! - `ArcSwapOption` for the graph: writers load it per event, lock-free
//! - No graph means failsafe output: INFO and above to stderr
//! - Stopped means no output at all

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing::{Metadata, Subscriber};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{reload, Registry};

use crate::backend::{ApplyError, Destination, LegacyBridge, LoggerGraph, LoggingBackend};
use crate::source::ConfigDocument;

const FAILSAFE_LEVEL: LevelFilter = LevelFilter::INFO;

#[derive(Debug, Error)]
pub enum BackendInitError {
    #[error("a global tracing subscriber is already installed")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("a global `log` logger is already installed")]
    Bridge(#[from] log::SetLoggerError),
}

/// The concrete logging backend.
pub struct TracingBackend {
    graph: Arc<ArcSwapOption<LoggerGraph>>,
    filter: reload::Handle<Targets, Registry>,
    bridge: LegacyBridge,
}

impl TracingBackend {
    /// Create a backend and the subscriber it controls.
    ///
    /// The subscriber is not installed anywhere; use it with
    /// `tracing::subscriber::with_default` or `set_global_default`.
    pub fn new() -> (Self, impl Subscriber + Send + Sync + 'static) {
        Self::with_bridge(LegacyBridge::detached())
    }

    /// Create a backend, install its subscriber as the global default and
    /// attach the `log` bridge.
    pub fn install_global() -> Result<Self, BackendInitError> {
        let (mut backend, subscriber) = Self::new();
        tracing::subscriber::set_global_default(subscriber)?;
        backend.bridge = LegacyBridge::attach()?;
        Ok(backend)
    }

    fn with_bridge(bridge: LegacyBridge) -> (Self, impl Subscriber + Send + Sync + 'static) {
        let graph = Arc::new(ArcSwapOption::empty());
        let (filter, handle) = reload::Layer::new(failsafe_filter());
        let subscriber = tracing_subscriber::registry().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(GraphWriter { graph: graph.clone() }),
        );

        let backend = Self {
            graph,
            filter: handle,
            bridge,
        };
        (backend, subscriber)
    }

    pub fn bridge(&self) -> &LegacyBridge {
        &self.bridge
    }

    /// Whether a graph is currently installed.
    pub fn is_configured(&self) -> bool {
        self.graph.load().is_some()
    }

    fn set_filter(&self, targets: Targets) {
        if let Err(e) = self.filter.reload(targets) {
            // Only fails once the subscriber is gone, so nobody would see output anyway.
            eprintln!("hotlog: could not update level filter: {e}");
        }
    }

    fn flush_current(&self) {
        if let Some(graph) = self.graph.load_full() {
            if let Err(e) = graph.flush() {
                eprintln!("hotlog: could not flush log output: {e}");
            }
        }
    }
}

impl LoggingBackend for TracingBackend {
    type Graph = LoggerGraph;

    fn build(&self, document: &ConfigDocument) -> Result<LoggerGraph, ApplyError> {
        LoggerGraph::build(document)
    }

    fn install(&self, graph: LoggerGraph) {
        if let Err(e) = graph.activate() {
            eprintln!("hotlog: could not truncate log output: {e}");
        }
        let targets = graph.targets();
        self.graph.store(Some(Arc::new(graph)));
        self.set_filter(targets);
    }

    fn reset(&self) {
        self.flush_current();
        self.graph.store(None);
        self.set_filter(failsafe_filter());
    }

    fn stop(&self) {
        self.flush_current();
        self.set_filter(Targets::new());
        self.graph.store(None);
        self.bridge.silence();
    }

    fn reinstall_bridge(&self) {
        let level = self
            .graph
            .load()
            .as_ref()
            .map_or(FAILSAFE_LEVEL, |graph| graph.max_level());
        self.bridge.reinstall(level);
    }

    fn destinations(&self) -> Vec<Destination> {
        self.graph
            .load()
            .as_ref()
            .map(|graph| graph.destinations())
            .unwrap_or_default()
    }
}

impl fmt::Debug for TracingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingBackend")
            .field("configured", &self.is_configured())
            .field("bridge", &self.bridge)
            .finish()
    }
}

fn failsafe_filter() -> Targets {
    Targets::new().with_default(FAILSAFE_LEVEL)
}

/// `MakeWriter` that resolves the route for each event against the graph
/// live at the time the event is written.
#[derive(Clone)]
struct GraphWriter {
    graph: Arc<ArcSwapOption<LoggerGraph>>,
}

impl<'a> MakeWriter<'a> for GraphWriter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriter {
            graph: self.graph.load_full(),
            route: None,
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        let graph = self.graph.load_full();
        let route = graph.as_ref().and_then(|g| g.route_index(meta.target()));
        RoutedWriter { graph, route }
    }
}

struct RoutedWriter {
    graph: Option<Arc<LoggerGraph>>,
    route: Option<usize>,
}

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.graph {
            Some(graph) => graph.write(self.route, buf)?,
            None => io::stderr().lock().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.graph {
            Some(graph) => graph.flush(),
            None => io::stderr().flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn document(info: &Path, level: &str) -> ConfigDocument {
        ConfigDocument::new(format!(
            "[root]\nlevel = {level:?}\nappenders = [\"info\"]\n\n[appender.info]\nkind = \"file\"\nfile = {info:?}\n"
        ))
    }

    #[test]
    fn test_events_follow_installed_graph() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first").join("info.log");
        let second = dir.path().join("second").join("info.log");

        let (backend, subscriber) = TracingBackend::new();
        tracing::subscriber::with_default(subscriber, || {
            backend.install(backend.build(&document(&first, "info")).unwrap());
            tracing::info!("to first");
            tracing::debug!("filtered out");

            backend.reset();
            backend.install(backend.build(&document(&second, "debug")).unwrap());
            tracing::debug!("to second");
        });

        let first_text = fs::read_to_string(&first).unwrap();
        let second_text = fs::read_to_string(&second).unwrap();
        assert!(first_text.contains("to first"));
        assert!(!first_text.contains("filtered out"));
        assert!(!first_text.contains("to second"));
        assert!(second_text.contains("to second"));
    }

    #[test]
    fn test_failed_build_leaves_graph_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let info = dir.path().join("info.log");

        let (backend, _subscriber) = TracingBackend::new();
        backend.install(backend.build(&document(&info, "info")).unwrap());

        assert!(backend.build(&ConfigDocument::from("[root]\nlevel = \"nope\"\n")).is_err());
        assert_eq!(backend.destinations()[0].file.as_deref(), Some(info.as_path()));
    }

    #[test]
    fn test_reset_and_stop_clear_destinations() {
        let dir = tempfile::tempdir().unwrap();
        let info = dir.path().join("info.log");

        let (backend, _subscriber) = TracingBackend::new();
        backend.install(backend.build(&document(&info, "info")).unwrap());
        assert!(backend.is_configured());

        backend.reset();
        assert!(backend.destinations().is_empty());

        backend.install(backend.build(&document(&info, "info")).unwrap());
        backend.reinstall_bridge();
        assert_eq!(backend.bridge().level(), LevelFilter::INFO);

        backend.stop();
        assert!(!backend.is_configured());
        assert_eq!(backend.bridge().level(), LevelFilter::OFF);
    }

    #[test]
    fn test_stopped_backend_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let info = dir.path().join("info.log");

        let (backend, subscriber) = TracingBackend::new();
        tracing::subscriber::with_default(subscriber, || {
            backend.install(backend.build(&document(&info, "info")).unwrap());
            tracing::info!("before stop");
            backend.stop();
            tracing::error!("after stop");
        });

        let text = fs::read_to_string(&info).unwrap();
        assert!(text.contains("before stop"));
        assert!(!text.contains("after stop"));
    }
}
