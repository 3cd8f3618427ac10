//! TTCN-3 Tools
//!
//! Command line tools for checking serialized TTCN-3 programs.

use tracing_subscriber::{fmt, EnvFilter};

const CRATES: [&str; 3] = ["ttcn_tools", "ttcn_compiler", "ttcn_resolve"];

/// How much the checker tools log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Per-file summaries.
    #[default]
    Normal,
    /// Import dependencies and other checker decisions.
    Debug,
    /// Everything, including every resolved reference.
    Trace,
}

impl Verbosity {
    /// Verbosity from the `-v` count and `--quiet`; `--quiet` wins.
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Debug,
            (false, _) => Self::Trace,
        }
    }

    /// Filter directives used when `RUST_LOG` is unset.
    pub fn filter(self) -> String {
        let (others, ours) = match self {
            Self::Quiet => ("error", "error"),
            Self::Normal => ("warn", "info"),
            Self::Debug => ("warn", "debug"),
            Self::Trace => ("info", "trace"),
        };
        let mut directives = vec![others.to_string()];
        directives.extend(CRATES.iter().map(|krate| format!("{krate}={ours}")));
        directives.join(",")
    }
}

/// Initialize logging to stderr.
///
/// `RUST_LOG` overrides the filter derived from `verbosity`.
pub fn init_logging(verbosity: Verbosity) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter()));

    fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= Verbosity::Debug)
        .with_writer(std::io::stderr)
        .init();
}
