//! Process-wide logger registry
//!
//! Maps names to shared loggers and holds the defaults applied to loggers it
//! creates. [`Registry::global`] is the instance behind the crate-level free
//! functions; independent registries can be created with [`Registry::new`].

use super::config::LoggingConfig;
use super::dispatcher::{AsyncConfig, ShutdownMode};
use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::logger::{ErrorHandler, Logger};
use super::pattern::PatternFormatter;
use super::sink::SinkRef;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Whether registry-wide level and pattern changes reach loggers that
/// already exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelPropagation {
    /// Apply to every registered logger and to loggers created later
    #[default]
    Retroactive,
    /// Only change the defaults used for loggers created later
    NewLoggersOnly,
}

#[derive(Clone)]
struct Defaults {
    level: LogLevel,
    flush_level: LogLevel,
    formatter: Arc<PatternFormatter>,
    async_config: Option<AsyncConfig>,
    propagation: LevelPropagation,
    error_handler: Option<ErrorHandler>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            flush_level: LogLevel::Off,
            formatter: Arc::new(PatternFormatter::default()),
            async_config: None,
            propagation: LevelPropagation::default(),
            error_handler: None,
        }
    }
}

/// Name → logger map with shared defaults
///
/// # Example
///
/// ```
/// use rust_log_engine::prelude::*;
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// let sink = Arc::new(MemorySink::new());
/// registry.set_pattern("%n: %v").unwrap();
///
/// let logger = registry.create("db", vec![sink.clone()]).unwrap();
/// logger.info("connected", &[]).unwrap();
///
/// assert!(registry.get("db").is_some());
/// assert_eq!(sink.lines(), vec!["db: connected"]);
/// ```
#[derive(Default)]
pub struct Registry {
    // Lock order: defaults before loggers
    defaults: RwLock<Defaults>,
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first use
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Create a logger with the registry defaults and register it
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if `name` is taken, or the error of starting
    /// the async dispatcher
    pub fn create(&self, name: impl Into<String>, sinks: Vec<SinkRef>) -> Result<Arc<Logger>> {
        let name = name.into();
        let defaults = self.defaults.read();
        if self.loggers.read().contains_key(&name) {
            return Err(LoggerError::DuplicateName(name));
        }

        let mut builder = Logger::builder(name)
            .sinks(sinks)
            .level(defaults.level)
            .flush_level(defaults.flush_level)
            .formatter(Arc::clone(&defaults.formatter));
        if let Some(config) = &defaults.async_config {
            builder = builder.async_mode(config.clone());
        }
        if let Some(handler) = &defaults.error_handler {
            builder = builder.error_handler(Arc::clone(handler));
        }

        let logger = Arc::new(builder.build()?);
        self.insert(Arc::clone(&logger))?;
        Ok(logger)
    }

    /// Register a logger built elsewhere. Its level and pattern are kept.
    pub fn register(&self, logger: Arc<Logger>) -> Result<()> {
        let _defaults = self.defaults.read();
        self.insert(logger)
    }

    fn insert(&self, logger: Arc<Logger>) -> Result<()> {
        let mut loggers = self.loggers.write();
        if loggers.contains_key(logger.name()) {
            return Err(LoggerError::DuplicateName(logger.name().to_string()));
        }
        loggers.insert(logger.name().to_string(), logger);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Logger>> {
        self.loggers.read().get(name).cloned()
    }

    /// Like [`Registry::get`], failing with `NameNotFound`
    pub fn try_get(&self, name: &str) -> Result<Arc<Logger>> {
        self.get(name)
            .ok_or_else(|| LoggerError::NameNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loggers.read().contains_key(name)
    }

    /// Names of all registered loggers, sorted
    pub fn logger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loggers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.loggers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.read().is_empty()
    }

    /// Remove `name` from the registry.
    ///
    /// Handles held elsewhere keep working; the logger is torn down when the
    /// last one is dropped.
    pub fn drop(&self, name: &str) -> Result<()> {
        let removed = self.loggers.write().remove(name);
        match removed {
            Some(_) => Ok(()),
            None => Err(LoggerError::NameNotFound(name.to_string())),
        }
    }

    /// Flush every logger, drain async queues and empty the registry
    pub fn drop_all(&self) {
        let loggers: Vec<Arc<Logger>> = {
            let mut map = self.loggers.write();
            map.drain().map(|(_, logger)| logger).collect()
        };
        for logger in loggers {
            if !logger.shutdown(ShutdownMode::Drain) {
                eprintln!(
                    "[LOGGER WARNING] Logger '{}' did not shut down cleanly",
                    logger.name()
                );
            }
        }
    }

    /// Stop everything. Safe to call more than once.
    pub fn shutdown(&self) {
        self.drop_all();
    }

    /// Flush every registered logger.
    ///
    /// All loggers are flushed even if some fail; the failures are returned
    /// together.
    pub fn flush_all(&self) -> Result<()> {
        let failures: Vec<LoggerError> = self
            .snapshot()
            .iter()
            .filter_map(|logger| logger.flush().err())
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(LoggerError::sink_failures("registry", &failures))
        }
    }

    /// Run `f` on every registered logger
    pub fn apply_all(&self, mut f: impl FnMut(&Arc<Logger>)) {
        for logger in self.snapshot() {
            f(&logger);
        }
    }

    fn snapshot(&self) -> Vec<Arc<Logger>> {
        self.loggers.read().values().cloned().collect()
    }

    pub fn default_level(&self) -> LogLevel {
        self.defaults.read().level
    }

    pub fn default_pattern(&self) -> String {
        self.defaults.read().formatter.pattern().to_string()
    }

    pub fn async_config(&self) -> Option<AsyncConfig> {
        self.defaults.read().async_config.clone()
    }

    pub fn level_propagation(&self) -> LevelPropagation {
        self.defaults.read().propagation
    }

    pub fn set_level_propagation(&self, propagation: LevelPropagation) {
        self.defaults.write().propagation = propagation;
    }

    /// Change the default level and, when retroactive, every logger's level
    pub fn set_level(&self, level: LogLevel) {
        let mut defaults = self.defaults.write();
        defaults.level = level;
        if defaults.propagation == LevelPropagation::Retroactive {
            for logger in self.loggers.read().values() {
                logger.set_level(level);
            }
        }
    }

    /// Change the default pattern and, when retroactive, every logger's pattern.
    ///
    /// The pattern is compiled first; on error nothing changes.
    pub fn set_pattern(&self, pattern: &str) -> Result<()> {
        let formatter = Arc::new(PatternFormatter::new(pattern)?);
        let mut defaults = self.defaults.write();
        defaults.formatter = Arc::clone(&formatter);
        if defaults.propagation == LevelPropagation::Retroactive {
            for logger in self.loggers.read().values() {
                logger.set_formatter(Arc::clone(&formatter));
            }
        }
        Ok(())
    }

    /// Flush level for new loggers and, when retroactive, existing ones
    pub fn flush_on(&self, level: LogLevel) {
        let mut defaults = self.defaults.write();
        defaults.flush_level = level;
        if defaults.propagation == LevelPropagation::Retroactive {
            for logger in self.loggers.read().values() {
                logger.flush_on(level);
            }
        }
    }

    /// Error handler for every current and future logger
    pub fn set_error_handler(&self, handler: ErrorHandler) {
        let mut defaults = self.defaults.write();
        defaults.error_handler = Some(Arc::clone(&handler));
        for logger in self.loggers.read().values() {
            logger.set_error_handler(Arc::clone(&handler));
        }
    }

    /// Loggers created from now on dispatch asynchronously with `config`.
    /// Existing loggers keep their mode.
    pub fn set_async_mode(&self, config: AsyncConfig) -> Result<()> {
        config.validate()?;
        self.defaults.write().async_config = Some(config);
        Ok(())
    }

    /// Loggers created from now on dispatch on the calling thread
    pub fn set_sync_mode(&self) {
        self.defaults.write().async_config = None;
    }

    /// Apply registry defaults from `config`, then create and register its
    /// loggers.
    ///
    /// Nothing is registered unless every logger could be built.
    pub fn apply_config(&self, config: &LoggingConfig) -> Result<Vec<Arc<Logger>>> {
        config.validate()?;
        for spec in &config.loggers {
            if self.contains(&spec.name) {
                return Err(LoggerError::DuplicateName(spec.name.clone()));
            }
        }

        // Defaults as they will be once the config is committed
        let mut staged = self.defaults.read().clone();
        if let Some(pattern) = &config.pattern {
            staged.formatter = Arc::new(PatternFormatter::new(pattern)?);
        }
        if let Some(level) = config.level {
            staged.level = level;
        }
        if let Some(level) = config.flush_level {
            staged.flush_level = level;
        }
        if let Some(settings) = &config.async_settings {
            let async_config = settings.to_async_config();
            async_config.validate()?;
            staged.async_config = Some(async_config);
        }

        let mut built = Vec::with_capacity(config.loggers.len());
        for spec in &config.loggers {
            let mut builder = Logger::builder(spec.name.clone())
                .sinks(spec.build_sinks()?)
                .level(spec.level.unwrap_or(staged.level))
                .flush_level(spec.flush_level.unwrap_or(staged.flush_level));
            builder = match &spec.pattern {
                Some(pattern) => builder.pattern(pattern.clone()),
                None => builder.formatter(Arc::clone(&staged.formatter)),
            };
            let async_config = match spec.async_mode {
                Some(false) => None,
                Some(true) => Some(staged.async_config.clone().unwrap_or_default()),
                None => staged.async_config.clone(),
            };
            if let Some(async_config) = async_config {
                builder = builder.async_mode(async_config);
            }
            if let Some(handler) = &staged.error_handler {
                builder = builder.error_handler(Arc::clone(handler));
            }
            built.push(Arc::new(builder.build()?));
        }

        let mut defaults = self.defaults.write();
        let mut loggers = self.loggers.write();
        if let Some(taken) = built.iter().find(|l| loggers.contains_key(l.name())) {
            return Err(LoggerError::DuplicateName(taken.name().to_string()));
        }

        if defaults.propagation == LevelPropagation::Retroactive {
            for logger in loggers.values() {
                if config.level.is_some() {
                    logger.set_level(staged.level);
                }
                if config.pattern.is_some() {
                    logger.set_formatter(Arc::clone(&staged.formatter));
                }
                if config.flush_level.is_some() {
                    logger.flush_on(staged.flush_level);
                }
            }
        }
        // Only the fields the config names, so concurrent changes to the
        // others survive
        if config.level.is_some() {
            defaults.level = staged.level;
        }
        if config.pattern.is_some() {
            defaults.formatter = staged.formatter;
        }
        if config.flush_level.is_some() {
            defaults.flush_level = staged.flush_level;
        }
        if config.async_settings.is_some() {
            defaults.async_config = staged.async_config;
        }

        for logger in &built {
            loggers.insert(logger.name().to_string(), Arc::clone(logger));
        }
        Ok(built)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("loggers", &self.logger_names())
            .field("default_level", &self.default_level())
            .field("default_pattern", &self.default_pattern())
            .field("async", &self.async_config().is_some())
            .finish()
    }
}
