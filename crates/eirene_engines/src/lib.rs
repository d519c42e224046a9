#![forbid(unsafe_code)]

pub mod catalog;
pub mod ph1dialogue;
pub mod ph1plan;
pub mod ph1risk;
pub mod selection;
