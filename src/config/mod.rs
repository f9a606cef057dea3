//! Configuration loading.

mod global;

pub use global::{
    CONFIG_PATH_ENV, DEFAULT_API_BASE, DEFAULT_ORG, DEFAULT_RAW_BASE, PgetConfig, Timeouts,
};
