//! Level-gated diagnostics output on stderr.

use std::sync::atomic::{AtomicU8, Ordering};

// Do *not* make the fields public here to force going through `From`/`Into`, OK?
#[derive(Debug, clap::Args)]
pub struct LogLevelOpt {
    /// Show what is being done (which sources are loaded, which
    /// caches are built)
    #[clap(short, long)]
    verbose: bool,

    /// Show information that helps debug this program (implies
    /// `--verbose`)
    #[clap(short, long)]
    debug: bool,

    /// Do not even show warnings (e.g. about timesteps that could
    /// not be extracted)
    #[clap(short, long)]
    quiet: bool,
}

impl From<LogLevelOpt> for LogLevel {
    fn from(value: LogLevelOpt) -> Self {
        match value {
            LogLevelOpt {
                verbose: _,
                debug: true,
                quiet: _,
            } => LogLevel::Debug,
            LogLevelOpt {
                verbose: true,
                debug: false,
                quiet: _,
            } => LogLevel::Info,
            LogLevelOpt {
                verbose: false,
                debug: false,
                quiet: true,
            } => LogLevel::None,
            LogLevelOpt {
                verbose: false,
                debug: false,
                quiet: false,
            } => LogLevel::Warn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Do not log anything
    None,
    /// Problems that do not stop the program, e.g. a timestep that
    /// could not be evaluated
    Warn,
    /// Verbose execution, not for debugging this program but for
    /// giving the user information about what is going on
    Info,
    /// Highest amount of log statement, for debugging this program
    Debug,
}

impl LogLevel {
    // Not public api, only for sorting or comparisons!
    fn level(self) -> u8 {
        self as u8
    }

    fn from_level(level: u8) -> Option<Self> {
        let slf = match level {
            0 => Some(LogLevel::None),
            1 => Some(LogLevel::Warn),
            2 => Some(LogLevel::Info),
            3 => Some(LogLevel::Debug),
            _ => None,
        }?;
        assert_eq!(slf.level(), level);
        Some(slf)
    }
}

impl PartialOrd for LogLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.level().cmp(&other.level())
    }
}

/// Warnings are shown unless explicitly silenced.
pub static LOGLEVEL: AtomicU8 = AtomicU8::new(1);

pub fn set_log_level(val: LogLevel) {
    LOGLEVEL.store(val.level(), Ordering::Relaxed);
}

#[inline]
pub fn log_level() -> LogLevel {
    let level = LOGLEVEL.load(Ordering::Relaxed);
    LogLevel::from_level(level).expect("no possibility to store invalid u8")
}

#[macro_export]
macro_rules! warn {
    { $($arg:tt)* } => {
        if $crate::utillib::logging::log_level() >= $crate::utillib::logging::LogLevel::Warn {
            eprintln!("warning: {}", format_args!($($arg)*));
        }
    }
}

#[macro_export]
macro_rules! info {
    { $($arg:tt)* } => {
        if $crate::utillib::logging::log_level() >= $crate::utillib::logging::LogLevel::Info {
            eprintln!($($arg)*);
        }
    }
}

#[macro_export]
macro_rules! debug {
    { $($arg:tt)* } => {
        if $crate::utillib::logging::log_level() >= $crate::utillib::logging::LogLevel::Debug {
            eprintln!($($arg)*);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_levels() {
        for i in 0..=3 {
            assert!(LogLevel::from_level(i).is_some());
        }
        assert!(LogLevel::from_level(4).is_none());
        assert!(LogLevel::Debug > LogLevel::Info);
        assert!(LogLevel::Warn > LogLevel::None);
    }

    #[test]
    fn t_opt_mapping() {
        let lvl = |verbose, debug, quiet| {
            LogLevel::from(LogLevelOpt {
                verbose,
                debug,
                quiet,
            })
        };
        assert_eq!(lvl(false, false, false), LogLevel::Warn);
        assert_eq!(lvl(false, false, true), LogLevel::None);
        assert_eq!(lvl(true, false, true), LogLevel::Info);
        assert_eq!(lvl(false, true, false), LogLevel::Debug);
    }
}
