#![forbid(unsafe_code)]

pub mod ph1dialogue;
pub mod ph1plan;
pub mod ph1risk;
pub mod turn_executor;
