#![deny(unsafe_code)]

pub mod clock;
pub mod link;
pub mod traffic;
