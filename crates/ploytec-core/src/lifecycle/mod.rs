//! Dext lifecycle module.

pub mod machine;

pub use machine::{DextEvent, DextState, transition};
