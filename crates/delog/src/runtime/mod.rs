//! Runtime module: boot and run loop of the `delog` binary.

pub mod boot;
pub mod cli;
pub mod run;
