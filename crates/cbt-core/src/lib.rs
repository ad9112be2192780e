//! cbt-core: Exam session flow, scoring, and application state.
//!
//! This crate defines the data model, the store trait, and the sequential
//! session logic (select, answer, time, score) that the rest of cbt builds on.

pub mod app;
pub mod bulk;
pub mod catalog;
pub mod error;
pub mod model;
pub mod pending;
pub mod scorer;
pub mod selector;
pub mod session;
pub mod statistics;
pub mod timer;
pub mod traits;

pub use error::{CbtError, StoreError};
