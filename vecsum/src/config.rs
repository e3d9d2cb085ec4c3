//! The configuration record a run is built from.
//!
//! Loading it (CLI flags, environment) is the caller's business; the record is
//! constructed once and moved into the [`crate::Driver`].

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
};

use crate::{sum::SumMode, Error};

/// 8MiB, the chunk size the benchmark was tuned with.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(8 * 1024 * 1024) {
    Some(n) => n,
    None => panic!("chunk size must be non-zero"),
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Buffered,
    ZeroCopy,
    LocalMemory,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Buffered, Strategy::ZeroCopy, Strategy::LocalMemory];
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buffered" => Ok(Strategy::Buffered),
            "zero-copy" | "zero_copy" | "zcr" => Ok(Strategy::ZeroCopy),
            "local-memory" | "local_memory" => Ok(Strategy::LocalMemory),
            x => Err(format!(
                "invalid strategy: {x:?}, expected buffered, zero-copy or local-memory"
            )),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Strategy::Buffered => "buffered",
            Strategy::ZeroCopy => "zero-copy",
            Strategy::LocalMemory => "local-memory",
        })
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct Config {
    pub path: PathBuf,
    pub passes: NonZeroU32,
    pub strategy: Strategy,
    /// Don't sum, only read. Isolates I/O cost from compute cost.
    pub skip_reduction: bool,
    pub chunk_size: NonZeroUsize,
    pub sum_mode: SumMode,
    /// `mlock` the arena of [`Strategy::LocalMemory`].
    pub lock_memory: bool,
}

impl Config {
    pub fn new(path: impl Into<PathBuf>, passes: NonZeroU32, strategy: Strategy) -> Self {
        Self {
            path: path.into(),
            passes,
            strategy,
            skip_reduction: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sum_mode: SumMode::default(),
            lock_memory: true,
        }
    }

    /// Precondition check for records that didn't come from a typed loader.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::Configuration("path must not be empty".to_owned()));
        }
        Ok(())
    }
}

/// Environment variables the `benchmark` binaries read their flags from.
pub const ENV_VARS: [&str; 7] = [
    "VECSUM_PATH",
    "VECSUM_PASSES",
    "VECSUM_STRATEGY",
    "VECSUM_SKIP_SUM",
    "VECSUM_CHUNK_SIZE",
    "VECSUM_SUM_MODE",
    "VECSUM_LOCK_MEMORY",
];

/// Reject `VECSUM_*` variables that no flag reads, so that a typo doesn't silently
/// fall back to a default.
pub fn assert_no_unknown_env_vars() -> Result<(), Error> {
    check_env_var_names(std::env::vars_os().filter_map(|(k, _)| k.into_string().ok()))
}

fn check_env_var_names<I>(names: I) -> Result<(), Error>
where
    I: IntoIterator<Item = String>,
{
    for name in names.into_iter().filter(|v| v.starts_with("VECSUM_")) {
        match name.as_str() {
            x if ENV_VARS.contains(&x) => {}
            "VECSUM_ZCR" => {
                return Err(Error::Configuration(
                    "VECSUM_ZCR is not supported, set VECSUM_STRATEGY=zero-copy instead".to_owned(),
                ))
            }
            x => {
                return Err(Error::Configuration(format!(
                    "env var starts with VECSUM_ but is not a known setting: {x:?}"
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strategy() {
        assert_eq!("buffered".parse::<Strategy>(), Ok(Strategy::Buffered));
        assert_eq!("zero-copy".parse::<Strategy>(), Ok(Strategy::ZeroCopy));
        assert_eq!("zcr".parse::<Strategy>(), Ok(Strategy::ZeroCopy));
        assert_eq!("local_memory".parse::<Strategy>(), Ok(Strategy::LocalMemory));
        assert!("mmap".parse::<Strategy>().is_err());
        for s in Strategy::ALL {
            assert_eq!(s.to_string().parse::<Strategy>(), Ok(s));
        }
    }

    #[test]
    fn defaults() {
        let config = Config::new("/tmp/x", NonZeroU32::new(2).unwrap(), Strategy::Buffered);
        assert_eq!(config.chunk_size.get(), 8 << 20);
        assert_eq!(config.sum_mode, SumMode::Simd);
        assert!(!config.skip_reduction);
        assert!(config.lock_memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_path_is_rejected() {
        let config = Config::new("", NonZeroU32::new(1).unwrap(), Strategy::Buffered);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn env_var_names() {
        let ok = ["PATH", "VECSUM_PATH", "VECSUM_PASSES", "RUST_LOG"].map(String::from);
        assert!(check_env_var_names(ok).is_ok());

        let typo = ["VECSUM_PASSSES".to_owned()];
        let err = check_env_var_names(typo).unwrap_err();
        assert!(err.to_string().contains("VECSUM_PASSSES"), "{err}");

        let legacy = ["VECSUM_ZCR".to_owned()];
        let err = check_env_var_names(legacy).unwrap_err();
        assert!(err.to_string().contains("VECSUM_STRATEGY"), "{err}");
    }
}
