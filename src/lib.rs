//! Cartguard - checkout protection widget controller
//!
//! Drives an insurance widget (return assurance, shipping protection,
//! delivery guarantee) embedded in a checkout: loads the merchant's config,
//! quotes the cart, keeps the insurance line in the cart in step with the
//! widget's checkbox, and re-synchronises whenever the buyer edits the cart.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the collaborator ports
//! - **Service Layer** (`services`): snapshot store, phase controller, cart
//!   observer and reconciler, widget runtime
//! - **Adapters** (`adapters`): in-memory collaborators
//! - **Application Layer** (`application`): scenario simulation
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use cartguard::{WidgetRuntime, WidgetCollaborators};
//!
//! let runtime = WidgetRuntime::new(widget, collaborators, advisory, &config.runtime);
//! let mut events = runtime.events();
//! let handle = runtime.spawn();
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    CartLine, Config, InsuranceType, LinesBrief, MerchantConfig, Quote, WidgetConfig,
    WidgetPhase, WidgetSnapshot,
};
pub use domain::ports::{CartGateway, QuoteService, SessionStorage, WidgetSurface};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    SnapshotStore, WidgetCollaborators, WidgetEvent, WidgetEventPayload, WidgetHandle,
    WidgetRuntime,
};
