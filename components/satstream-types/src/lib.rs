extern crate serde;

#[macro_use]
extern crate serde_derive;

mod blocks;
mod ordinals;

pub use blocks::*;
pub use ordinals::*;
