#![forbid(unsafe_code)]

pub mod common;
pub mod pack;
pub mod ph1audit;
pub mod ph1dialogue;
pub mod ph1plan;
pub mod ph1risk;
pub mod ph1session;

pub use common::{
    ContractViolation, EmotionTag, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate,
};
