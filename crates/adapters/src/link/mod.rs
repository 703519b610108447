pub mod channel;
pub mod memory;
