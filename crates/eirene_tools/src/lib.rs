#![forbid(unsafe_code)]

pub mod console;
