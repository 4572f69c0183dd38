//! Logger graph: the document grammar and its built form.
//!
//! # Document
//! ```toml
//! [root]
//! level = "info"
//! appenders = ["console", "info"]
//!
//! [[logger]]
//! name = "hyper"
//! level = "warn"
//! appenders = []
//! additive = true
//!
//! [appender.console]
//! kind = "console"      # target = "stdout" | "stderr"
//!
//! [appender.info]
//! kind = "file"
//! file = "logs/info.log"
//! append = true
//! ```
//!
//! # Design Decisions
//! - Logger names match event targets by prefix, like `Targets` does
//! - A logger without a level inherits from the closest named ancestor
//! - Additive loggers also write to the root's appenders
//! - Only appenders that something references are opened, and only once
//!   the whole document has been checked
//! - `append = false` files are emptied by `activate`, not by `build`

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;

use crate::backend::{ApplyError, Destination};
use crate::source::ConfigDocument;

const ROOT: &str = "root";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GraphSpec {
    #[serde(default)]
    root: RootSpec,
    #[serde(default, rename = "logger")]
    loggers: Vec<LoggerSpec>,
    #[serde(default, rename = "appender")]
    appenders: BTreeMap<String, AppenderSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RootSpec {
    level: String,
    appenders: Vec<String>,
}

impl Default for RootSpec {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            appenders: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggerSpec {
    name: String,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    appenders: Vec<String>,
    #[serde(default = "default_true")]
    additive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum AppenderSpec {
    Console {
        #[serde(default)]
        target: ConsoleTarget,
    },
    File {
        file: PathBuf,
        #[serde(default = "default_true")]
        append: bool,
    },
}

#[derive(Debug, Default, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

fn default_true() -> bool {
    true
}

/// Where formatted lines go.
#[derive(Debug)]
enum Sink {
    Stdout,
    Stderr,
    File {
        path: PathBuf,
        file: Mutex<File>,
        /// `append = false`: emptied on activation.
        fresh: bool,
    },
}

impl Sink {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().lock().write_all(buf),
            Sink::Stderr => io::stderr().lock().write_all(buf),
            Sink::File { file, .. } => file.lock().unwrap_or_else(PoisonError::into_inner).write_all(buf),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().flush(),
            Sink::Stderr => io::stderr().flush(),
            Sink::File { file, .. } => file.lock().unwrap_or_else(PoisonError::into_inner).flush(),
        }
    }

    fn truncate_if_fresh(&self) -> io::Result<()> {
        match self {
            Sink::File { file, fresh: true, .. } => {
                let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
                file.set_len(0)?;
                file.seek(SeekFrom::Start(0)).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            Sink::File { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Appender {
    name: String,
    sink: Sink,
}

#[derive(Debug, Clone)]
struct Route {
    level: LevelFilter,
    /// Indexes into `LoggerGraph::appenders`.
    appenders: Vec<usize>,
}

#[derive(Debug)]
struct Logger {
    name: String,
    route: Route,
}

/// A built logger graph: levels per logger and open output destinations.
#[derive(Debug)]
pub struct LoggerGraph {
    root: Route,
    /// Longest name first, so the first match is the closest one.
    loggers: Vec<Logger>,
    appenders: Vec<Appender>,
}

impl LoggerGraph {
    /// Parse `document` and open every referenced destination.
    pub fn build(document: &ConfigDocument) -> Result<Self, ApplyError> {
        let spec: GraphSpec = toml::from_str(document.as_str()?)?;
        Self::from_spec(spec)
    }

    fn from_spec(spec: GraphSpec) -> Result<Self, ApplyError> {
        // Check the whole document before any file is touched.
        let root_level = parse_level(ROOT, &spec.root.level)?;
        let mut explicit: Vec<(&str, LevelFilter)> = Vec::new();
        for logger in &spec.loggers {
            if let Some(level) = &logger.level {
                explicit.push((&logger.name, parse_level(&logger.name, level)?));
            }
        }

        let mut referenced: Vec<&str> = Vec::new();
        let owners = std::iter::once((ROOT, &spec.root.appenders))
            .chain(spec.loggers.iter().map(|l| (l.name.as_str(), &l.appenders)));
        for (owner, names) in owners {
            for name in names {
                if !spec.appenders.contains_key(name) {
                    return Err(ApplyError::UnknownAppender {
                        logger: owner.to_string(),
                        appender: name.clone(),
                    });
                }
                if !referenced.contains(&name.as_str()) {
                    referenced.push(name);
                }
            }
        }

        let mut appenders = Vec::with_capacity(referenced.len());
        for name in &referenced {
            if let Some(appender_spec) = spec.appenders.get(*name) {
                appenders.push(Appender {
                    name: name.to_string(),
                    sink: open_sink(appender_spec)?,
                });
            }
        }

        let indexes = |names: &[String]| -> Vec<usize> {
            let mut out = Vec::with_capacity(names.len());
            for name in names {
                if let Some(index) = referenced.iter().position(|r| *r == name.as_str()) {
                    if !out.contains(&index) {
                        out.push(index);
                    }
                }
            }
            out
        };

        let root = Route {
            level: root_level,
            appenders: indexes(&spec.root.appenders),
        };

        let mut loggers = Vec::with_capacity(spec.loggers.len());
        for logger in &spec.loggers {
            let level = explicit
                .iter()
                .filter(|(name, _)| logger.name.starts_with(name))
                .max_by_key(|(name, _)| name.len())
                .map_or(root_level, |(_, level)| *level);

            let mut route_appenders = indexes(&logger.appenders);
            if logger.additive {
                for index in &root.appenders {
                    if !route_appenders.contains(index) {
                        route_appenders.push(*index);
                    }
                }
            }

            loggers.push(Logger {
                name: logger.name.clone(),
                route: Route {
                    level,
                    appenders: route_appenders,
                },
            });
        }
        loggers.sort_by(|a, b| b.name.len().cmp(&a.name.len()));

        Ok(Self { root, loggers, appenders })
    }

    /// Truncate the files of non-appending destinations. Called when the
    /// graph goes live, never while it is only built.
    pub fn activate(&self) -> io::Result<()> {
        self.appenders.iter().try_for_each(|a| a.sink.truncate_if_fresh())
    }

    /// Index of the logger responsible for `target`, `None` for root.
    pub fn route_index(&self, target: &str) -> Option<usize> {
        self.loggers.iter().position(|l| target.starts_with(&l.name))
    }

    /// Write one formatted line to every appender on the route.
    pub fn write(&self, route: Option<usize>, buf: &[u8]) -> io::Result<()> {
        for index in &self.route(route).appenders {
            self.appenders[*index].sink.write_all(buf)?;
        }
        Ok(())
    }

    pub fn flush(&self) -> io::Result<()> {
        self.appenders.iter().try_for_each(|a| a.sink.flush())
    }

    /// Level filter equivalent to this graph's logger levels.
    pub fn targets(&self) -> Targets {
        self.loggers
            .iter()
            .fold(Targets::new().with_default(self.root.level), |targets, logger| {
                targets.with_target(logger.name.clone(), logger.route.level)
            })
    }

    /// The most verbose level enabled anywhere in the graph.
    pub fn max_level(&self) -> LevelFilter {
        self.loggers
            .iter()
            .map(|l| l.route.level)
            .fold(self.root.level, LevelFilter::max)
    }

    /// Effective level for `target`.
    pub fn level_for(&self, target: &str) -> LevelFilter {
        self.route(self.route_index(target)).level
    }

    /// Every attached destination, in the order first referenced.
    pub fn destinations(&self) -> Vec<Destination> {
        self.appenders
            .iter()
            .map(|a| Destination {
                name: a.name.clone(),
                file: a.sink.path().map(Path::to_path_buf),
            })
            .collect()
    }

    fn route(&self, index: Option<usize>) -> &Route {
        index.and_then(|i| self.loggers.get(i)).map_or(&self.root, |l| &l.route)
    }
}

fn parse_level(logger: &str, level: &str) -> Result<LevelFilter, ApplyError> {
    LevelFilter::from_str(level.trim()).map_err(|_| ApplyError::InvalidLevel {
        logger: logger.to_string(),
        level: level.to_string(),
    })
}

fn open_sink(spec: &AppenderSpec) -> Result<Sink, ApplyError> {
    match spec {
        AppenderSpec::Console { target: ConsoleTarget::Stdout } => Ok(Sink::Stdout),
        AppenderSpec::Console { target: ConsoleTarget::Stderr } => Ok(Sink::Stderr),
        AppenderSpec::File { file, append } => {
            let open_err = |source: io::Error| ApplyError::OpenFile {
                path: file.clone(),
                source,
            };
            let path = std::path::absolute(file).map_err(open_err)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(open_err)?;
            }
            let handle = OpenOptions::new()
                .create(true)
                .write(true)
                .append(*append)
                .truncate(false)
                .open(&path)
                .map_err(open_err)?;
            Ok(Sink::File {
                path,
                file: Mutex::new(handle),
                fresh: !*append,
            })
        }
    }
}
