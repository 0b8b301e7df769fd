#![deny(unused_variables)]
#![warn(unused_imports)]

pub mod config;
pub mod error;
pub mod source;
pub mod traits;
pub mod types;
