//! Recording widget surface.
//!
//! Keeps the rendered widget as plain state so tests and the simulator can
//! inspect it, and lets them click the checkbox through the bound handler.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Quote;
use crate::domain::ports::{CheckboxBinding, CheckboxUpdate, WidgetProps, WidgetSurface};

/// The widget as currently drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedWidget {
    /// Widget instance name.
    pub name: String,
    /// Quote the widget was first rendered with.
    pub quote_id: String,
    /// Description text.
    pub description: String,
    /// Checkbox value.
    pub checked: bool,
    /// Checkbox interactivity.
    pub disabled: bool,
}

#[derive(Default)]
struct SurfaceState {
    widget: Option<RenderedWidget>,
    binding: Option<CheckboxBinding>,
}

/// Widget surface that records what would be drawn.
pub struct RecordingSurface {
    state: Mutex<SurfaceState>,
    mounted: AtomicBool,
    fail_renders: AtomicBool,
    renders: AtomicUsize,
}

impl RecordingSurface {
    /// Mounted surface with nothing rendered.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SurfaceState::default()),
            mounted: AtomicBool::new(true),
            fail_renders: AtomicBool::new(false),
            renders: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mount or unmount the render target.
    pub fn set_mounted(&self, mounted: bool) {
        self.mounted.store(mounted, Ordering::SeqCst);
    }

    /// Make first renders fail.
    pub fn fail_renders(&self, fail: bool) {
        self.fail_renders.store(fail, Ordering::SeqCst);
    }

    /// The widget as drawn, if any.
    pub fn widget(&self) -> Option<RenderedWidget> {
        self.state().widget.clone()
    }

    /// Whether a change handler is attached.
    pub fn is_bound(&self) -> bool {
        self.state().binding.is_some()
    }

    /// Number of times the widget was appended to the tree.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Simulate the buyer clicking the checkbox.
    ///
    /// Returns `false` when there is no enabled, bound checkbox to click.
    pub fn click(&self, checked: bool) -> bool {
        let binding = {
            let state = self.state();
            match (&state.widget, &state.binding) {
                (Some(widget), Some(binding)) if !widget.disabled => binding.clone(),
                _ => return false,
            }
        };
        binding.toggle(checked)
    }

    fn check_render(&self, operation: &str) -> DomainResult<()> {
        if self.fail_renders.load(Ordering::SeqCst) {
            return Err(DomainError::RenderTargetUnavailable(format!(
                "{operation} rejected by host"
            )));
        }
        Ok(())
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetSurface for RecordingSurface {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn has_widget(&self) -> bool {
        self.state().widget.is_some()
    }

    fn checkbox_value(&self) -> Option<bool> {
        self.state().widget.as_ref().map(|widget| widget.checked)
    }

    fn describe(&self, quote: &Quote) -> String {
        format!(
            "Protect your order for {:.2} {}",
            quote.price, quote.currency_code
        )
    }

    fn render_widget(&self, props: WidgetProps) -> DomainResult<()> {
        self.check_render("render")?;
        self.state().widget = Some(RenderedWidget {
            name: props.name,
            quote_id: props.quote.quote_id,
            description: props.description,
            checked: props.checked,
            disabled: true,
        });
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove_widget(&self) -> DomainResult<bool> {
        let mut state = self.state();
        state.binding = None;
        Ok(state.widget.take().is_some())
    }

    fn update_description(&self, text: &str) -> DomainResult<()> {
        self.check_render("update_description")?;
        if let Some(widget) = self.state().widget.as_mut() {
            widget.description = text.to_string();
        }
        Ok(())
    }

    fn update_checkbox(&self, update: CheckboxUpdate) -> DomainResult<()> {
        if let Some(widget) = self.state().widget.as_mut() {
            if let Some(value) = update.value {
                widget.checked = value;
            }
            if let Some(disabled) = update.disabled {
                widget.disabled = disabled;
            }
        }
        Ok(())
    }

    fn bind_checkbox(&self, binding: CheckboxBinding) -> DomainResult<()> {
        self.state().binding = Some(binding);
        Ok(())
    }
}
