//! Shared doubles and fixtures for the integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use hotlog::backend::{ApplyError, Destination, LoggingBackend};
use hotlog::observability::StatusManager;
use hotlog::source::{ConfigSource, ResourceBundle, ResourceNames};
use hotlog::watch::{WatchCallback, WatchError};
use hotlog::{ConfigDocument, ConfigHash, FileWatchService, ReloadingAdapter, WatchControl};

/// Default template used by the fixtures. Its `info` destination points at a
/// relative path, so lookups resolve against the working directory.
pub const TEMPLATE: &str = "info=logs/info.log\n";

/// Everything the recording backend has been asked to do.
#[derive(Debug, Default)]
pub struct Recording {
    pub builds: Vec<String>,
    pub installs: Vec<String>,
    pub live: Option<String>,
    pub resets: usize,
    pub stops: usize,
    pub bridge_installs: usize,
    /// Set between `build` and `reinstall_bridge`.
    pub applying: bool,
    /// Applies that started while another was still in progress.
    pub overlaps: usize,
}

/// A backend whose "graph" is the document text.
///
/// Documents containing `reject` fail to build. Lines of the form
/// `name=path` become file-backed destinations.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    recording: Arc<Mutex<Recording>>,
    build_delay: Option<Duration>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep inside `build`, widening the window for concurrent applies.
    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = Some(delay);
        self
    }

    pub fn recording(&self) -> MutexGuard<'_, Recording> {
        self.recording.lock().unwrap()
    }

    pub fn live(&self) -> Option<String> {
        self.recording().live.clone()
    }
}

impl LoggingBackend for RecordingBackend {
    type Graph = String;

    fn build(&self, document: &ConfigDocument) -> Result<String, ApplyError> {
        let text = document.as_str().map_err(ApplyError::Encoding)?.to_string();
        {
            let mut rec = self.recording();
            if rec.applying {
                rec.overlaps += 1;
            }
            rec.applying = true;
            rec.builds.push(text.clone());
        }
        if let Some(delay) = self.build_delay {
            thread::sleep(delay);
        }
        if text.contains("reject") {
            self.recording().applying = false;
            return Err(ApplyError::Rejected(format!("refusing {text:?}")));
        }
        Ok(text)
    }

    fn install(&self, graph: String) {
        let mut rec = self.recording();
        rec.installs.push(graph.clone());
        rec.live = Some(graph);
    }

    fn reset(&self) {
        let mut rec = self.recording();
        rec.resets += 1;
        rec.live = None;
    }

    fn stop(&self) {
        let mut rec = self.recording();
        rec.stops += 1;
        rec.live = None;
    }

    fn reinstall_bridge(&self) {
        let mut rec = self.recording();
        rec.bridge_installs += 1;
        rec.applying = false;
    }

    fn destinations(&self) -> Vec<Destination> {
        let rec = self.recording();
        let Some(live) = &rec.live else {
            return Vec::new();
        };
        live.lines()
            .filter_map(|line| line.split_once('='))
            .map(|(name, file)| Destination {
                name: name.trim().to_string(),
                file: Some(PathBuf::from(file.trim())),
            })
            .collect()
    }
}

/// One call to [`ManualWatchService::watch`].
pub struct Registration {
    pub path: PathBuf,
    pub last_known: ConfigHash,
    callback: Option<WatchCallback>,
    pub stopped: bool,
}

/// A watch service driven by the test instead of the filesystem.
#[derive(Clone, Default)]
pub struct ManualWatchService {
    registrations: Arc<Mutex<Vec<Registration>>>,
}

impl ManualWatchService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registrations(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    pub fn watched_path(&self) -> Option<PathBuf> {
        self.registrations.lock().unwrap().last().map(|r| r.path.clone())
    }

    pub fn last_known(&self) -> Option<ConfigHash> {
        self.registrations.lock().unwrap().last().map(|r| r.last_known)
    }

    /// Deliver `document` to the latest registration, as a change event
    /// would. `None` when nothing is registered or the watch has stopped.
    pub fn fire(&self, document: impl Into<ConfigDocument>) -> Option<WatchControl> {
        let mut callback = {
            let mut regs = self.registrations.lock().unwrap();
            let reg = regs.last_mut()?;
            if reg.stopped {
                return None;
            }
            reg.callback.take()?
        };

        let control = callback(document.into());

        let mut regs = self.registrations.lock().unwrap();
        if let Some(reg) = regs.last_mut() {
            reg.callback = Some(callback);
            reg.stopped = control == WatchControl::Stop;
        }
        Some(control)
    }
}

impl FileWatchService for ManualWatchService {
    fn watch(&self, path: &Path, last_known: ConfigHash, callback: WatchCallback) -> Result<(), WatchError> {
        self.registrations.lock().unwrap().push(Registration {
            path: path.to_path_buf(),
            last_known,
            callback: Some(callback),
            stopped: false,
        });
        Ok(())
    }
}

/// Source reading `<dir>/logging.toml`, with [`TEMPLATE`] as the default.
pub fn file_source(dir: &Path) -> ConfigSource {
    let resources = ResourceBundle::new().with_resource("logging-default.toml", TEMPLATE);
    ConfigSource::new(resources, ResourceNames::default(), dir.join("logging.toml"))
}

pub fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("logging.toml");
    std::fs::write(&path, content).unwrap();
    path
}

pub struct Fixture {
    pub adapter: ReloadingAdapter<RecordingBackend>,
    pub backend: RecordingBackend,
    pub watch: ManualWatchService,
    pub status: StatusManager,
}

pub fn fixture(dir: &Path) -> Fixture {
    fixture_with(file_source(dir), RecordingBackend::new())
}

pub fn fixture_with(source: ConfigSource, backend: RecordingBackend) -> Fixture {
    let watch = ManualWatchService::new();
    let status = StatusManager::new();
    let adapter = ReloadingAdapter::new(source, Some(Arc::new(watch.clone())), status.clone());
    Fixture {
        adapter,
        backend,
        watch,
        status,
    }
}
