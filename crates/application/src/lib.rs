#![forbid(unsafe_code)]

pub mod admission_service_impl;
pub mod packet_pipeline;
