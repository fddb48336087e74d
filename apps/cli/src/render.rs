//! # Terminal Renderer
//!
//! Renders controller events as text and keeps the last rendered state.
//!
//! ## Output
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  [info]    🔄 Connected to the store, loading products...              │
//! │  📦 Products (2)                                                        │
//! │    • Suco  (bebidas)  R$ 7.50   ID: 4f1c...                             │
//! │    • Bolo  (doces)    R$ 20     ID: 9a2b...                             │
//! │  📊 Total: 2 | Categories: 2 | Average: R$ 14                           │
//! │  [success] ✅ Connected! 2 product(s) loaded                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::Write;
use std::sync::{Mutex, RwLock};
use tracing::{debug, error};

use vitrine_core::projection::{cards, ProductCard};
use vitrine_core::{ConnectionStatus, Product, Stats, StatusKind, User};
use vitrine_sync::CatalogEventEmitter;

/// Last rendered UI state.
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub status: Option<ConnectionStatus>,
    pub cards: Vec<ProductCard>,
    pub stats: Stats,
    pub loading: bool,
    pub user: Option<String>,
}

/// [`CatalogEventEmitter`] writing to a terminal (or any writer).
pub struct TerminalRenderer {
    out: Mutex<Box<dyn Write + Send>>,
    state: RwLock<RenderState>,
    debug_mode: bool,
}

impl TerminalRenderer {
    pub fn new(out: Box<dyn Write + Send>, debug_mode: bool) -> Self {
        TerminalRenderer {
            out: Mutex::new(out),
            state: RwLock::new(RenderState::default()),
            debug_mode,
        }
    }

    pub fn stdout(debug_mode: bool) -> Self {
        Self::new(Box::new(std::io::stdout()), debug_mode)
    }

    /// Snapshot of what was rendered last.
    pub fn state(&self) -> RenderState {
        self.state
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Writes free text (help, checklists).
    pub fn print(&self, text: &str) {
        self.write(text);
    }

    fn write(&self, text: &str) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{}", text).and_then(|_| out.flush()) {
            error!(?e, "Failed to write to terminal");
        }
    }

    fn update(&self, f: impl FnOnce(&mut RenderState)) {
        if let Ok(mut state) = self.state.write() {
            f(&mut state);
        }
    }
}

fn status_tag(kind: StatusKind) -> &'static str {
    match kind {
        StatusKind::Info => "[info]   ",
        StatusKind::Success => "[success]",
        StatusKind::Error => "[error]  ",
    }
}

impl CatalogEventEmitter for TerminalRenderer {
    fn emit_status(&self, status: &ConnectionStatus) {
        self.update(|s| s.status = Some(status.clone()));
        self.write(&format!("{} {}", status_tag(status.kind), status.text));
    }

    fn emit_products(&self, products: &[Product]) {
        let rendered = cards(products);

        let mut text = String::new();
        if rendered.is_empty() {
            text.push_str("📦 No products found\n   Add the first one with: add <category>, <name>, <price>");
        } else {
            text.push_str(&format!("📦 Products ({})", rendered.len()));
            for (card, product) in rendered.iter().zip(products) {
                text.push_str(&format!(
                    "\n  • {}  ({})  {}   ID: {}",
                    card.title, card.category, card.price, card.id
                ));
                if self.debug_mode {
                    if let Some(created_at) = product.created_at {
                        text.push_str(&format!("   created {}", created_at.to_rfc3339()));
                    }
                }
            }
        }

        debug!(count = rendered.len(), "Rendering product list");
        self.update(|s| s.cards = rendered);
        self.write(&text);
    }

    fn emit_stats(&self, stats: &Stats) {
        self.update(|s| s.stats = *stats);
        self.write(&format!(
            "📊 Total: {} | Categories: {} | Average: {}",
            stats.count,
            stats.distinct_category_count,
            stats.average_label()
        ));
    }

    fn emit_loading(&self, loading: bool) {
        self.update(|s| s.loading = loading);
        if loading {
            self.write("⏳ Loading...");
        }
    }

    fn emit_user(&self, user: Option<&User>) {
        let label = user.map(User::label);
        match &label {
            Some(label) => self.write(&format!("👤 Signed in as {}", label)),
            None => self.write("👤 Not signed in"),
        }
        self.update(|s| s.user = label);
    }
}
