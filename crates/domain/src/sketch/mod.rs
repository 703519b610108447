pub mod countmin;
pub mod entity;
pub mod error;
pub mod hash;
pub mod rolling;
pub mod row;
