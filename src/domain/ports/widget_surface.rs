//! Render target port and the checkbox types it exchanges.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{MerchantConfig, Quote};

/// Everything needed to draw the widget the first time.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetProps {
    /// Widget instance name.
    pub name: String,
    /// Initial checkbox value.
    pub checked: bool,
    /// Accepted quote being offered.
    pub quote: Quote,
    /// Merchant settings, for policy text.
    pub merchant_config: Option<MerchantConfig>,
    /// Description line under the checkbox.
    pub description: String,
}

/// Partial checkbox update; `None` fields are left as they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckboxUpdate {
    /// Checked state.
    pub value: Option<bool>,
    /// Interactivity.
    pub disabled: Option<bool>,
}

impl CheckboxUpdate {
    /// Change interactivity only.
    pub const fn disabled(disabled: bool) -> Self {
        Self {
            value: None,
            disabled: Some(disabled),
        }
    }

    /// Set value and interactivity together.
    pub const fn both(value: bool, disabled: bool) -> Self {
        Self {
            value: Some(value),
            disabled: Some(disabled),
        }
    }
}

/// Change handler attached to the checkbox.
///
/// Calling it forwards the buyer's choice to the owning widget; it returns
/// `false` when the widget is gone.
#[derive(Clone)]
pub struct CheckboxBinding {
    handler: Arc<dyn Fn(bool) -> bool + Send + Sync>,
}

impl CheckboxBinding {
    /// Wrap a change handler.
    pub fn new(handler: impl Fn(bool) -> bool + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Deliver a buyer click.
    pub fn toggle(&self, checked: bool) -> bool {
        (self.handler)(checked)
    }
}

impl fmt::Debug for CheckboxBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckboxBinding").finish_non_exhaustive()
    }
}

/// Port for the rendered widget in the host's UI tree.
pub trait WidgetSurface: Send + Sync {
    /// Whether the host reports the render target as mounted.
    fn is_mounted(&self) -> bool;

    /// Whether this widget is currently present in the tree.
    fn has_widget(&self) -> bool;

    /// Current checkbox value, `None` when no checkbox is rendered.
    fn checkbox_value(&self) -> Option<bool>;

    /// Description text for a quote.
    fn describe(&self, quote: &Quote) -> String;

    /// First render.
    fn render_widget(&self, props: WidgetProps) -> DomainResult<()>;

    /// Remove the widget; returns whether one was present.
    fn remove_widget(&self) -> DomainResult<bool>;

    /// Replace the description of the rendered widget.
    fn update_description(&self, text: &str) -> DomainResult<()>;

    /// Apply a partial checkbox update.
    fn update_checkbox(&self, update: CheckboxUpdate) -> DomainResult<()>;

    /// Attach the change handler.
    fn bind_checkbox(&self, binding: CheckboxBinding) -> DomainResult<()>;
}
