//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the collaborator interfaces the widget core consumes:
//! - QuoteService: merchant config and quote endpoints
//! - CartGateway: live cart lines, mutations and attributes
//! - SessionStorage: session-scoped key-value storage
//! - WidgetSurface: the rendered widget and its checkbox
//!
//! The core stays transport-agnostic over these traits.

pub mod cart_gateway;
pub mod quote_service;
pub mod session_storage;
pub mod widget_surface;

pub use cart_gateway::CartGateway;
pub use quote_service::QuoteService;
pub use session_storage::SessionStorage;
pub use widget_surface::{CheckboxBinding, CheckboxUpdate, WidgetProps, WidgetSurface};
