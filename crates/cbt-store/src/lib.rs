//! cbt-store: backends for the `ResultStore` seam.
//!
//! `HttpStore` talks to the school's REST API; `MemoryStore` keeps
//! everything in process for tests and offline demos. `config` loads
//! `cbt.toml` and builds the right store.

pub mod config;
pub mod http;
pub mod memory;
mod wire;

pub use config::{create_store, load_config_from, CbtConfig};
pub use http::HttpStore;
pub use memory::MemoryStore;
