#![forbid(unsafe_code)]

pub mod admission;
pub mod common;
pub mod packet;
pub mod sketch;
