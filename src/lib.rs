#![allow(clippy::inline_always)]

//! Parallel, syscall-level directory accounting: per-directory file counts and byte totals
//! across huge trees, optionally split by owning user.

pub mod cli;
pub mod counter;
pub mod error;
pub mod fs;
pub mod inode_set;
pub mod model;
pub mod output;
pub mod pool;
pub mod regexfilter;
pub mod run;
pub mod status;
pub mod tree;
pub mod units;
pub mod users;

pub use cli::Args;
pub use error::DuError;
pub use model::{DirResult, Job, TreeIndex};
pub use run::run;

//this allocator is more efficient than jemalloc through my testing
#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;
