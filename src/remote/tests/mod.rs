//! Unit tests for the remote execution module.

mod rsync;
mod ssh;
