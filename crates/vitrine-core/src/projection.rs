//! # Projection Layer
//!
//! Pure mapping from a product list to what the UI shows: aggregate stats
//! and one display card per product.
//!
//! ## Average Price Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  prices: "10"   "20"   "abc"   "0"   "-5"                               │
//! │            │      │      │      │      │                                │
//! │            ▼      ▼      ▼      ▼      ▼                                │
//! │          1000   2000   skip   skip   skip   (cents; non-positive and   │
//! │            │      │                          unparsable are dropped    │
//! │            └──┬───┘                          from sum AND divisor)     │
//! │               ▼                                                         │
//! │        3000 / 2 = 1500 cents ──► round half-up ──► 15                   │
//! │                                                                         │
//! │  No valid prices at all ──► 0                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stats are recomputed on every snapshot and never cached.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::money::Money;
use crate::types::Product;

// =============================================================================
// Stats
// =============================================================================

/// Aggregate statistics over a product list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Number of products in the list.
    pub count: usize,

    /// Number of distinct non-empty categories.
    pub distinct_category_count: usize,

    /// Mean of the valid prices, rounded to whole currency units.
    pub average_price: i64,
}

impl Stats {
    /// Display label for the average price.
    pub fn average_label(&self) -> String {
        if self.average_price > 0 {
            format!("R$ {}", self.average_price)
        } else {
            "R$ 0".to_string()
        }
    }
}

/// Computes [`Stats`] for a product list.
///
/// ## Example
/// ```rust
/// use vitrine_core::projection::{project, Stats};
///
/// assert_eq!(project(&[]), Stats { count: 0, distinct_category_count: 0, average_price: 0 });
/// ```
pub fn project(products: &[Product]) -> Stats {
    let categories: HashSet<&str> = products
        .iter()
        .map(|p| p.category.as_str())
        .filter(|c| !c.is_empty())
        .collect();

    // i128: any number of i64 prices sums without overflow.
    let (sum, valid) = products
        .iter()
        .filter_map(|p| Money::parse(&p.price))
        .filter(Money::is_positive)
        .fold((0_i128, 0_i64), |(sum, n), price| {
            (sum + i128::from(price.cents()), n + 1)
        });

    Stats {
        count: products.len(),
        distinct_category_count: categories.len(),
        average_price: rounded_mean_units(sum, valid),
    }
}

/// Mean of `n` cent amounts summing to `sum_cents`, in whole units, half-up.
fn rounded_mean_units(sum_cents: i128, n: i64) -> i64 {
    if n == 0 {
        return 0;
    }
    // floor((2 * sum + 100n) / 200n) == round_half_up(sum / 100n)
    let sum = sum_cents;
    let n = i128::from(n);
    let units = (2 * sum + 100 * n).div_euclid(200 * n);
    i64::try_from(units).unwrap_or(i64::MAX)
}

// =============================================================================
// Display Cards
// =============================================================================

/// One rendered product entry, with fallbacks for missing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCard {
    pub title: String,
    pub category: String,
    pub price: String,
    pub id: String,
}

/// Maps products to display cards, preserving store order.
pub fn cards(products: &[Product]) -> Vec<ProductCard> {
    products
        .iter()
        .map(|p| ProductCard {
            title: non_empty_or(&p.name, "Unnamed product"),
            category: non_empty_or(&p.category, "No category"),
            price: format!("R$ {}", non_empty_or(&p.price, "0")),
            id: p
                .id
                .as_deref()
                .filter(|id| !id.is_empty())
                .unwrap_or("N/A")
                .to_string(),
        })
        .collect()
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
