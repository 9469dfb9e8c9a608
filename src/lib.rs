#![forbid(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod entries;
pub mod error;
pub mod formats;
pub mod index;
pub mod logging;
pub mod manifest;
pub mod navigation;
pub mod offset;
pub mod overlay;
pub mod search;
pub mod session;
pub mod source;
pub mod state_store;
pub mod worker;
