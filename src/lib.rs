#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod blueprint;
pub mod cli;
mod core;
mod error;
mod executor;
pub mod fileset;
mod graph;
#[cfg(feature = "logging")]
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod transform;
mod utils;

pub use crate::blueprint::{Blueprint, TaskDef};
pub use crate::core::Hash32;
pub use crate::error::*;
pub use crate::executor::{Diagnostics, Executor, TaskExecution, TaskState};
pub use crate::fileset::{FileEntry, FileSet};
pub use crate::graph::{Plan, TaskGraph};
pub use crate::pipeline::{Layout, Options};
