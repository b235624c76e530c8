//! Behavioural scenarios for `biolinux install` phase orchestration.

mod install;
