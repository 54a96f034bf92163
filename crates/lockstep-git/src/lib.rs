//! Lockstep Git - git operations for release workflows
//!
//! [`GitRepo`] implements the core `GitOps` trait. Mutating operations and
//! anything touching remotes run the `git` binary, one subprocess per call,
//! under a timeout; repository discovery and HEAD lookups go through `git2`.

mod ops;
mod repository;

pub use repository::{GitRepo, DEFAULT_GIT_TIMEOUT};
