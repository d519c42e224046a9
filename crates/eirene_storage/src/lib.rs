#![forbid(unsafe_code)]

pub mod builtin;
pub mod pack_source;
pub mod repo;
pub mod store;
