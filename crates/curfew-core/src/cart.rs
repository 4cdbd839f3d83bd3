//! Pending cart contents as handed over by the storefront.

use serde::{Deserialize, Serialize};

use crate::catalog::ProductId;

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Storefront key identifying the line.
    pub line_key: String,
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl CartLine {
    pub fn new(line_key: impl Into<String>, product_id: ProductId) -> Self {
        Self {
            line_key: line_key.into(),
            product_id,
            quantity: 1,
        }
    }
}

/// An ordered set of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Removes the line with `line_key`, returning it if present.
    pub fn remove_line(&mut self, line_key: &str) -> Option<CartLine> {
        let pos = self.lines.iter().position(|l| l.line_key == line_key)?;
        Some(self.lines.remove(pos))
    }
}
