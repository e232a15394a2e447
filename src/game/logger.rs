//! Bump-allocating game logger
//!
//! Narration from the engine, the resolvers and the controllers all goes
//! through one [`GameLogger`]. Lines can go to stdout, to an in-memory buffer
//! (tests, batch runs) or both. Formatted lines are built in a bump arena that
//! is reset once it grows, so narration does not churn the global allocator.

use bumpalo::Bump;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, Ref, RefCell};
use std::fmt::{self, Write as FmtWrite};
use std::ops::Deref;

/// Arena size at which the formatting bump is reset
const BUMP_RESET_BYTES: usize = 64 * 1024;

/// Verbosity level for game output
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum VerbosityLevel {
    /// No output during the game
    Silent = 0,
    /// Only the outcome
    Minimal = 1,
    /// Phases, turns and resolved events (default)
    #[default]
    Normal = 2,
    /// Every roll and state change
    Verbose = 3,
}

impl std::str::FromStr for VerbosityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityLevel::Silent),
            "minimal" | "1" => Ok(VerbosityLevel::Minimal),
            "normal" | "2" => Ok(VerbosityLevel::Normal),
            "verbose" | "3" => Ok(VerbosityLevel::Verbose),
            other => Err(format!("unknown verbosity '{}'", other)),
        }
    }
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Output destination for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    #[default]
    Stdout,
    /// Capture only to the in-memory buffer
    Memory,
    Both,
}

/// A captured log line
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: VerbosityLevel,
    pub message: String,
    /// Optional category (e.g. "decision", "phase")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Read-only view of the captured entries
pub struct LogGuard<'a> {
    guard: Ref<'a, Vec<LogEntry>>,
}

impl<'a> LogGuard<'a> {
    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.guard.iter()
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

impl<'a> Deref for LogGuard<'a> {
    type Target = [LogEntry];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

pub struct GameLogger {
    verbosity: VerbosityLevel,
    output_format: OutputFormat,
    output_mode: OutputMode,
    /// Lazily printed phase header for the current phase
    phase_header: Option<String>,
    header_printed: Cell<bool>,
    /// Print the state hash before each applied action
    debug_state_hash: bool,

    format_bump: RefCell<Bump>,
    log_buffer: RefCell<Vec<LogEntry>>,
}

impl GameLogger {
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        GameLogger {
            verbosity,
            output_format: OutputFormat::default(),
            output_mode: OutputMode::default(),
            phase_header: None,
            header_printed: Cell::new(false),
            debug_state_hash: false,
            format_bump: RefCell::new(Bump::new()),
            log_buffer: RefCell::new(Vec::new()),
        }
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    /// Capture to memory only (suppresses stdout)
    pub fn enable_capture(&mut self) {
        self.output_mode = OutputMode::Memory;
    }

    pub fn disable_capture(&mut self) {
        self.output_mode = OutputMode::Stdout;
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.output_mode, OutputMode::Memory | OutputMode::Both)
    }

    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.output_format = format;
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    pub fn set_debug_state_hash(&mut self, enabled: bool) {
        self.debug_state_hash = enabled;
    }

    pub fn debug_state_hash_enabled(&self) -> bool {
        self.debug_state_hash
    }

    /// Remember the header of a new phase. It is printed before the first
    /// Normal line of the phase, so empty phases stay quiet.
    pub fn set_phase_header(&mut self, header: impl Into<String>) {
        self.phase_header = Some(header.into());
        self.header_printed.set(false);
    }

    /// Print captured logs to stdout and clear the buffer
    pub fn flush_buffer(&mut self) {
        let buffer = self.log_buffer.borrow();
        for entry in buffer.iter() {
            if entry.level <= self.verbosity {
                self.write_stdout(entry);
            }
        }
        drop(buffer);
        self.clear_logs();
    }

    /// Print only the last `tail_lines` captured lines, then clear
    pub fn flush_tail(&mut self, tail_lines: usize) {
        let buffer = self.log_buffer.borrow();
        let elided = buffer.len().saturating_sub(tail_lines);
        if elided > 0 {
            println!(
                ">>> {} LOG LINES ELIDED. PRINTING LAST {} LINES <<<",
                elided, tail_lines
            );
        }
        for entry in buffer.iter().skip(elided) {
            if entry.level <= self.verbosity {
                self.write_stdout(entry);
            }
        }
        drop(buffer);
        self.clear_logs();
    }

    pub fn logs(&self) -> LogGuard<'_> {
        LogGuard {
            guard: self.log_buffer.borrow(),
        }
    }

    pub fn clear_logs(&mut self) {
        self.log_buffer.borrow_mut().clear();
        self.format_bump.borrow_mut().reset();
    }

    fn write_stdout(&self, entry: &LogEntry) {
        match self.output_format {
            OutputFormat::Json => {
                if let Ok(line) = serde_json::to_string(entry) {
                    println!("{}", line);
                }
            }
            OutputFormat::Text => {
                if entry.level == VerbosityLevel::Minimal {
                    println!("{}", entry.message);
                } else {
                    println!("  {}", entry.message);
                }
            }
        }
    }

    fn emit(&self, level: VerbosityLevel, category: Option<&str>, message: &str) {
        if level == VerbosityLevel::Silent {
            return;
        }
        let capture = self.is_capturing();
        let output = matches!(self.output_mode, OutputMode::Stdout | OutputMode::Both)
            && level <= self.verbosity;
        if !capture && !output {
            return;
        }
        let entry = LogEntry {
            level,
            message: message.to_string(),
            category: category.map(str::to_string),
        };
        if output {
            if level == VerbosityLevel::Normal && !self.header_printed.get() {
                if let Some(header) = &self.phase_header {
                    if self.output_format == OutputFormat::Text {
                        println!("--- {} ---", header);
                    }
                }
                self.header_printed.set(true);
            }
            self.write_stdout(&entry);
        }
        if capture {
            self.log_buffer.borrow_mut().push(entry);
        }
    }

    /// Format into the bump arena, then log
    pub fn log_fmt(&self, level: VerbosityLevel, args: fmt::Arguments<'_>) {
        if level > self.verbosity && !self.is_capturing() {
            return;
        }
        {
            let bump = self.format_bump.borrow();
            let mut line = bumpalo::collections::String::new_in(&bump);
            if line.write_fmt(args).is_err() {
                return;
            }
            self.emit(level, None, line.as_str());
        }
        let mut bump = self.format_bump.borrow_mut();
        if bump.allocated_bytes() > BUMP_RESET_BYTES {
            bump.reset();
        }
    }

    #[inline]
    pub fn minimal(&self, message: &str) {
        self.emit(VerbosityLevel::Minimal, None, message);
    }

    #[inline]
    pub fn normal(&self, message: &str) {
        self.emit(VerbosityLevel::Normal, None, message);
    }

    #[inline]
    pub fn verbose(&self, message: &str) {
        self.emit(VerbosityLevel::Verbose, None, message);
    }

    /// Log a controller decision
    ///
    /// The stdout line names only the decision, never the controller, so logs
    /// from different controller kinds making the same choices compare equal.
    pub fn decision(&self, controller_name: &str, message: &str) {
        if self.debug_state_hash {
            eprintln!("  >>> {}: {}", controller_name, message);
        }
        self.emit(VerbosityLevel::Normal, Some("decision"), message);
    }
}

impl Default for GameLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GameLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameLogger")
            .field("verbosity", &self.verbosity)
            .field("output_mode", &self.output_mode)
            .field("log_count", &self.log_buffer.borrow().len())
            .finish()
    }
}

impl Clone for GameLogger {
    fn clone(&self) -> Self {
        GameLogger {
            verbosity: self.verbosity,
            output_format: self.output_format,
            output_mode: self.output_mode,
            phase_header: self.phase_header.clone(),
            header_printed: self.header_printed.clone(),
            debug_state_hash: self.debug_state_hash,
            format_bump: RefCell::new(Bump::new()),
            log_buffer: RefCell::new(Vec::new()),
        }
    }
}

impl Serialize for GameLogger {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("GameLogger", 3)?;
        state.serialize_field("verbosity", &self.verbosity)?;
        state.serialize_field("output_format", &self.output_format)?;
        state.serialize_field("output_mode", &self.output_mode)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for GameLogger {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct GameLoggerData {
            #[serde(default)]
            verbosity: VerbosityLevel,
            #[serde(default)]
            output_format: OutputFormat,
            #[serde(default)]
            output_mode: OutputMode,
        }

        let data = GameLoggerData::deserialize(deserializer)?;
        let mut logger = GameLogger::with_verbosity(data.verbosity);
        logger.output_format = data.output_format;
        logger.output_mode = data.output_mode;
        Ok(logger)
    }
}

/// Log through the bump arena at Verbose level. Compiles to nothing without
/// the `verbose-logging` feature.
#[macro_export]
macro_rules! log_verbose {
    ($logger:expr, $($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            $logger.log_fmt($crate::game::VerbosityLevel::Verbose, format_args!($($arg)*));
        }
        #[cfg(not(feature = "verbose-logging"))]
        {
            let _ = &$logger;
        }
    };
}
