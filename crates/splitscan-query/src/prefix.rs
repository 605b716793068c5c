//! Cartesian expansion of equality conditions over the row-key format.
//!
//! For format `[region, userId]` and `region IN ('US','EU') AND userId = '7'`
//! the expansion is `US-7`, `EU-7`. Expansion runs left to right and stops at
//! the first component without a usable equality, so the result is always a
//! set of prefixes of equal depth.

use std::collections::HashSet;

use thiserror::Error;

use splitscan_core::{Condition, RowKeyFormat};

/// Expansion would exceed the configured cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("row key prefix expansion exceeds {cap} prefixes")]
pub struct PrefixOverflow {
    pub cap: usize,
}

/// Distinct row-key prefixes of one depth.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrefixExpansion {
    pub prefixes: Vec<String>,
    /// Number of format components each prefix covers.
    pub depth: usize,
    /// True when every format component is covered.
    pub complete: bool,
}

impl PrefixExpansion {
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }
}

/// Builder for [`PrefixExpansion`] with an explicit size cap.
#[derive(Debug, Clone)]
pub struct PrefixExpander<'a> {
    format: &'a RowKeyFormat,
    cap: usize,
}

impl<'a> PrefixExpander<'a> {
    #[must_use]
    pub const fn new(format: &'a RowKeyFormat, cap: usize) -> Self {
        Self { format, cap }
    }

    /// Expands the equality conditions in `conditions`.
    ///
    /// A component whose equality values cannot all be coerced to their
    /// declared type counts as having none; a partial value list would
    /// silently drop rows.
    pub fn expand(&self, conditions: &[Condition]) -> Result<PrefixExpansion, PrefixOverflow> {
        let mut frontier: Vec<String> = Vec::new();
        let mut depth = 0;

        for component in &self.format.components {
            let Some(values) = equality_texts(conditions, component) else {
                break;
            };

            let next_len = if depth == 0 {
                values.len()
            } else {
                frontier.len().saturating_mul(values.len())
            };
            if next_len > self.cap {
                tracing::warn!(
                    component = %component,
                    prefixes = next_len,
                    cap = self.cap,
                    "row key prefix expansion overflow"
                );
                return Err(PrefixOverflow { cap: self.cap });
            }

            frontier = if depth == 0 {
                values
            } else {
                frontier
                    .iter()
                    .flat_map(|prefix| {
                        values
                            .iter()
                            .map(move |value| format!("{prefix}{}{value}", self.format.separator))
                    })
                    .collect()
            };
            depth += 1;
        }

        let mut seen = HashSet::new();
        frontier.retain(|prefix| seen.insert(prefix.clone()));

        Ok(PrefixExpansion {
            complete: depth > 0 && depth == self.format.components.len(),
            prefixes: frontier,
            depth,
        })
    }
}

/// Distinct key texts of the equalities on `column`, in condition order.
fn equality_texts(conditions: &[Condition], column: &str) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let mut texts = Vec::new();

    for condition in conditions.iter().filter(|c| c.is_eq_on(column)) {
        match condition.coerced() {
            Ok(coerced) => {
                let text = coerced.value.to_key_text();
                if seen.insert(text.clone()) {
                    texts.push(text);
                }
            }
            Err(err) => {
                tracing::warn!(column, error = %err, "ignoring equalities on column for key planning");
                return None;
            }
        }
    }

    (!texts.is_empty()).then_some(texts)
}
