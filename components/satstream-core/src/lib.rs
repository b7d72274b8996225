#[macro_use]
extern crate hiro_system_kit;

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate lazy_static;

extern crate serde;

pub extern crate satstream_postgres;
pub extern crate satstream_types;

pub mod core;
pub mod db;
pub mod ord;
pub mod service;
pub mod utils;
