//! Codec configuration.

use std::env;

use crate::core::accumulator::IO_SIZE_MIN;

pub const DEFAULT_IO_SIZE: usize = 4096;
pub const DEFAULT_MAX_DEPTH: usize = 32;
pub const DEFAULT_MAX_LINE: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Accumulator size of a sink; bounds the payload of one I/O record.
    pub io_size: usize,
    /// Deepest nesting a reader's tokenizer accepts, at most
    /// [`crate::reader::MAX_DEPTH_CEILING`].
    pub max_depth: usize,
    /// Longest line a reader buffers, in bytes, not counting its newline.
    pub max_line: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            io_size: DEFAULT_IO_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            max_line: DEFAULT_MAX_LINE,
        }
    }
}

impl LogConfig {
    /// Defaults overridden by `TAPE_LOG_IO_SIZE`, `TAPE_LOG_MAX_DEPTH` and
    /// `TAPE_LOG_MAX_LINE`. Blank or unparsable values are ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            io_size: env_usize("TAPE_LOG_IO_SIZE")
                .map(|size| size.max(IO_SIZE_MIN))
                .unwrap_or(defaults.io_size),
            max_depth: env_usize("TAPE_LOG_MAX_DEPTH").unwrap_or(defaults.max_depth),
            max_line: env_usize("TAPE_LOG_MAX_LINE")
                .filter(|&max_line| max_line > 0)
                .unwrap_or(defaults.max_line),
        }
    }

    pub fn with_io_size(mut self, io_size: usize) -> Self {
        self.io_size = io_size;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env_string_opt(key).and_then(|value| value.trim().parse().ok())
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{LogConfig, DEFAULT_IO_SIZE, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LINE};
    use crate::core::accumulator::IO_SIZE_MIN;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn env_defaults_apply_when_unset() {
        let _lock = env_lock();
        let _size = set_env_guard("TAPE_LOG_IO_SIZE", None);
        let _depth = set_env_guard("TAPE_LOG_MAX_DEPTH", None);
        let _line = set_env_guard("TAPE_LOG_MAX_LINE", None);

        let config = LogConfig::from_env();
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.io_size, DEFAULT_IO_SIZE);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.max_line, DEFAULT_MAX_LINE);
    }

    #[test]
    fn env_overrides_are_parsed() {
        let _lock = env_lock();
        let _size = set_env_guard("TAPE_LOG_IO_SIZE", Some(" 8192 "));
        let _depth = set_env_guard("TAPE_LOG_MAX_DEPTH", Some("4"));
        let _line = set_env_guard("TAPE_LOG_MAX_LINE", Some("65536"));

        let config = LogConfig::from_env();
        assert_eq!(config.io_size, 8192);
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.max_line, 65536);
    }

    #[test]
    fn env_invalid_values_fall_back() {
        let _lock = env_lock();
        let _size = set_env_guard("TAPE_LOG_IO_SIZE", Some("12"));
        let _depth = set_env_guard("TAPE_LOG_MAX_DEPTH", Some("deep"));
        let _line = set_env_guard("TAPE_LOG_MAX_LINE", Some("0"));

        let config = LogConfig::from_env();
        assert_eq!(config.io_size, IO_SIZE_MIN);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.max_line, DEFAULT_MAX_LINE);
    }

    #[test]
    fn builders_override_fields() {
        let config = LogConfig::default()
            .with_io_size(128)
            .with_max_depth(1)
            .with_max_line(80);
        assert_eq!(
            config,
            LogConfig {
                io_size: 128,
                max_depth: 1,
                max_line: 80
            }
        );
    }
}
