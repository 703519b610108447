pub mod aligner;
pub mod builder;
pub mod encode;
pub mod entity;
pub mod error;
pub mod parser;
