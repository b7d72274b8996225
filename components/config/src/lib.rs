#[macro_use]
extern crate serde_derive;

mod config;
pub mod generator;
mod toml;

pub use crate::config::*;
