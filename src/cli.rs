//! CLI surface: a `clap` derive `Args` struct matching the reference crate's own style
//! (short/long pairs, `ValueHint`, closure-built help text), no config file or environment
//! variable surface.
use clap::{Parser, ValueHint};
use std::path::PathBuf;

/// Threshold substituted for whichever of `--file-limit`/`--size-limit` the user omitted, when
/// the other one was given — keeps a lone threshold governing emission on its own.
const AUTO_COUPLE_THRESHOLD: u64 = 1_000_000_000_000_000_000;

#[derive(Parser, Debug)]
#[command(version = env!("CARGO_PKG_VERSION"), about = "Parallel, syscall-level directory accounting")]
pub struct Args {
    #[arg(
        value_name = "PATH",
        help = "Directories to walk (defaults to the current directory)",
        value_hint = ValueHint::DirPath,
    )]
    pub roots: Vec<PathBuf>,

    #[arg(
        short = 'd',
        long = "max-depth",
        value_name = "N",
        help = "Emit rows only at depth <= N (root is depth 0)\n"
    )]
    pub max_depth: Option<u32>,

    #[arg(
        short = 'n',
        long = "file-limit",
        value_name = "N",
        help = "Only emit rows whose file count clears this threshold\n"
    )]
    pub file_limit: Option<u64>,

    #[arg(
        short = 'k',
        long = "size-limit",
        value_name = "SIZE",
        help = "Only emit rows whose byte total clears this threshold (accepts K/M/G/.../Ki/Mi/...)\n"
    )]
    pub size_limit: Option<String>,

    #[arg(long = "exclude", value_name = "REGEX", help = "Drop paths whose full path matches\n")]
    pub exclude: Option<String>,

    #[arg(long = "include", value_name = "REGEX", help = "Keep only paths whose full path matches\n")]
    pub include: Option<String>,

    #[arg(
        long = "exclude-subdirs",
        help = "Suppress subtree roll-up; each directory reports only its own files\n"
    )]
    pub exclude_subdirs: bool,

    #[arg(short = 'q', long = "quiet", help = "Suppress the header row\n")]
    pub quiet: bool,

    #[arg(short = 'u', long = "user", help = "Emit one row per owning uid\n")]
    pub user: bool,

    #[arg(
        short = 'h',
        long = "human-readable",
        help = "Print sizes as %.1f with a binary unit suffix\n"
    )]
    pub human_readable: bool,

    #[arg(
        short = 's',
        long = "status",
        value_name = "SECONDS",
        allow_negative_numbers = true,
        help = "Print progress every SECONDS seconds to stderr; negative disables\n"
    )]
    pub status: Option<f64>,

    #[arg(
        short = 'w',
        long = "workers",
        value_name = "N",
        default_value_t = 8,
        help = "Worker pool size (minimum 1)\n"
    )]
    pub workers: usize,
}

/// Resolved numeric thresholds after the size-limit suffix has been parsed and auto-coupling has
/// been applied (§6: "if exactly one of file-limit/size-limit is given, the unset one is treated
/// as 10^18").
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub file_limit: u64,
    pub size_limit: u64,
}

impl Args {
    #[must_use]
    pub fn thresholds(&self, size_limit_bytes: Option<u64>) -> Thresholds {
        match (self.file_limit, size_limit_bytes) {
            (Some(files), None) => Thresholds {
                file_limit: files,
                size_limit: AUTO_COUPLE_THRESHOLD,
            },
            (None, Some(size)) => Thresholds {
                file_limit: AUTO_COUPLE_THRESHOLD,
                size_limit: size,
            },
            (files, size) => Thresholds {
                file_limit: files.unwrap_or(0),
                size_limit: size.unwrap_or(0),
            },
        }
    }
}
