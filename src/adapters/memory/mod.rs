//! In-memory collaborators.
//!
//! Back the simulator and the test suites; each one records what the widget
//! asked of it and supports failure injection.

pub mod cart;
pub mod quote_service;
pub mod session_storage;
pub mod surface;

pub use cart::InMemoryCart;
pub use quote_service::StaticQuoteService;
pub use session_storage::InMemorySessionStorage;
pub use surface::{RecordingSurface, RenderedWidget};
