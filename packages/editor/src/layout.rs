//! # Column Layout
//!
//! A 12-unit grid with four breakpoints. Each column carries one span per
//! breakpoint, written as width classes:
//!
//! | Breakpoint | Class |
//! |---|---|
//! | xs | `col-N` |
//! | sm | `col-sm-N` |
//! | md | `col-md-N` |
//! | lg | `col-lg-N` |
//!
//! A breakpoint without a class inherits the next smaller one; a missing
//! `xs` span is 12. [`Layout`] values are immutable and always normalized.

use crate::errors::{EditorError, EditorResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const GRID_UNITS: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Xs,
    Sm,
    Md,
    Lg,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 4] = [Breakpoint::Xs, Breakpoint::Sm, Breakpoint::Md, Breakpoint::Lg];

    fn index(self) -> usize {
        self as usize
    }

    /// Class prefix, e.g. `col-md`
    pub fn prefix(self) -> &'static str {
        match self {
            Breakpoint::Xs => "col",
            Breakpoint::Sm => "col-sm",
            Breakpoint::Md => "col-md",
            Breakpoint::Lg => "col-lg",
        }
    }

    fn from_infix(infix: &str) -> Option<Self> {
        match infix {
            "sm" => Some(Breakpoint::Sm),
            "md" => Some(Breakpoint::Md),
            "lg" => Some(Breakpoint::Lg),
            _ => None,
        }
    }
}

/// Spans of one column at every breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnWidths([u8; 4]);

impl ColumnWidths {
    pub fn uniform(span: u8) -> Self {
        Self([span.clamp(1, GRID_UNITS); 4])
    }

    pub fn new(xs: u8, sm: u8, md: u8, lg: u8) -> Self {
        Self([xs, sm, md, lg].map(|s| s.clamp(1, GRID_UNITS)))
    }

    pub fn span(&self, breakpoint: Breakpoint) -> u8 {
        self.0[breakpoint.index()]
    }

    /// Parse a width class into its breakpoint and span
    pub fn parse_class(class: &str) -> Option<(Breakpoint, u8)> {
        let rest = class.strip_prefix("col-")?;
        let (breakpoint, digits) = match rest.split_once('-') {
            Some((infix, digits)) => (Breakpoint::from_infix(infix)?, digits),
            None => (Breakpoint::Xs, rest),
        };
        let span: u8 = digits.parse().ok()?;
        (1..=GRID_UNITS).contains(&span).then_some((breakpoint, span))
    }

    pub fn is_width_class(class: &str) -> bool {
        Self::parse_class(class).is_some()
    }

    /// Recover widths from a class list, applying inheritance
    pub fn from_classes<'a>(classes: impl IntoIterator<Item = &'a str>) -> Self {
        let mut found: [Option<u8>; 4] = [None; 4];
        for (breakpoint, span) in classes.into_iter().filter_map(Self::parse_class) {
            found[breakpoint.index()] = Some(span);
        }
        let mut spans = [GRID_UNITS; 4];
        let mut inherited = GRID_UNITS;
        for (i, span) in found.iter().enumerate() {
            inherited = span.unwrap_or(inherited);
            spans[i] = inherited;
        }
        Self(spans)
    }

    /// Width classes for every breakpoint
    pub fn classes(&self) -> Vec<String> {
        Breakpoint::ALL
            .iter()
            .map(|bp| format!("{}-{}", bp.prefix(), self.span(*bp)))
            .collect()
    }
}

impl fmt::Display for ColumnWidths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    columns: Vec<ColumnWidths>,
}

impl Layout {
    pub fn new(columns: Vec<ColumnWidths>) -> EditorResult<Self> {
        if columns.is_empty() {
            return Err(EditorError::InvalidLayout("a layout needs at least one column".to_string()));
        }
        if columns.len() > GRID_UNITS as usize {
            return Err(EditorError::InvalidLayout(format!(
                "{} columns do not fit in {} units",
                columns.len(),
                GRID_UNITS
            )));
        }
        Ok(Self {
            columns: normalize(columns),
        })
    }

    /// `count` columns of (nearly) equal width
    pub fn equal(count: usize) -> EditorResult<Self> {
        if count == 0 || count > GRID_UNITS as usize {
            return Layout::new(vec![ColumnWidths::uniform(GRID_UNITS); count]);
        }
        let base = GRID_UNITS as usize / count;
        let extra = GRID_UNITS as usize % count;
        let spans: Vec<u8> = (0..count).map(|i| (base + usize::from(i < extra)) as u8).collect();
        Layout::from_spans(&spans)
    }

    /// One span per column, the same at every breakpoint
    pub fn from_spans(spans: &[u8]) -> EditorResult<Self> {
        Layout::new(spans.iter().map(|s| ColumnWidths::uniform(*s)).collect())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnWidths] {
        &self.columns
    }

    pub fn widths(&self, index: usize) -> Option<ColumnWidths> {
        self.columns.get(index).copied()
    }

    pub fn total(&self, breakpoint: Breakpoint) -> u32 {
        self.columns.iter().map(|c| u32::from(c.span(breakpoint))).sum()
    }
}

/// Rescale every breakpoint whose total is not a whole number of rows
fn normalize(mut columns: Vec<ColumnWidths>) -> Vec<ColumnWidths> {
    for breakpoint in Breakpoint::ALL {
        let spans: Vec<u8> = columns.iter().map(|c| c.span(breakpoint)).collect();
        let total: u32 = spans.iter().map(|s| u32::from(*s)).sum();
        if total % u32::from(GRID_UNITS) == 0 {
            continue;
        }
        for (column, span) in columns.iter_mut().zip(rescale(&spans, total)) {
            column.0[breakpoint.index()] = span;
        }
    }
    columns
}

/// Largest-remainder apportionment of 12 units, at least 1 per column
fn rescale(spans: &[u8], total: u32) -> Vec<u8> {
    let units = f64::from(GRID_UNITS);
    let quotas: Vec<f64> = spans
        .iter()
        .map(|s| f64::from(*s) * units / f64::from(total))
        .collect();
    let mut result: Vec<u8> = quotas.iter().map(|q| (q.floor() as u8).max(1)).collect();
    let mut sum: u32 = result.iter().map(|s| u32::from(*s)).sum();

    while sum < u32::from(GRID_UNITS) {
        let index = (0..result.len())
            .max_by(|a, b| {
                let ra = quotas[*a] - f64::from(result[*a]);
                let rb = quotas[*b] - f64::from(result[*b]);
                ra.total_cmp(&rb).then(b.cmp(a))
            })
            .unwrap_or(0);
        result[index] += 1;
        sum += 1;
    }
    while sum > u32::from(GRID_UNITS) {
        let Some(index) = (0..result.len())
            .filter(|i| result[*i] > 1)
            .min_by(|a, b| {
                let ra = quotas[*a] - f64::from(result[*a]);
                let rb = quotas[*b] - f64::from(result[*b]);
                ra.total_cmp(&rb).then(b.cmp(a))
            })
        else {
            break;
        };
        result[index] -= 1;
        sum -= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(layout: &Layout, breakpoint: Breakpoint) -> Vec<u8> {
        layout.columns().iter().map(|c| c.span(breakpoint)).collect()
    }

    #[test]
    fn test_equal_layouts() {
        assert_eq!(spans(&Layout::equal(2).unwrap(), Breakpoint::Xs), vec![6, 6]);
        assert_eq!(spans(&Layout::equal(5).unwrap(), Breakpoint::Lg), vec![3, 3, 2, 2, 2]);
        assert!(Layout::equal(0).is_err());
        assert!(Layout::equal(13).is_err());
    }

    #[test]
    fn test_normalize_rescales_odd_totals() {
        let layout = Layout::from_spans(&[6, 6, 6]).unwrap();
        assert_eq!(spans(&layout, Breakpoint::Md), vec![4, 4, 4]);

        let layout = Layout::from_spans(&[5, 5]).unwrap();
        assert_eq!(spans(&layout, Breakpoint::Xs), vec![6, 6]);

        let layout = Layout::from_spans(&[1, 1, 1]).unwrap();
        assert_eq!(spans(&layout, Breakpoint::Xs), vec![4, 4, 4]);
    }

    #[test]
    fn test_normalize_keeps_wrapping_rows() {
        // Two full rows at xs is a valid stacked layout
        let layout = Layout::from_spans(&[12, 12]).unwrap();
        assert_eq!(spans(&layout, Breakpoint::Xs), vec![12, 12]);
    }

    #[test]
    fn test_rescale_keeps_minimum_span() {
        let mut input = vec![1u8; 11];
        input.push(12);
        let layout = Layout::from_spans(&input).unwrap();
        let result = spans(&layout, Breakpoint::Xs);
        assert_eq!(result.iter().map(|s| u32::from(*s)).sum::<u32>(), 12);
        assert!(result.iter().all(|s| *s >= 1));
    }

    #[test]
    fn test_widths_from_classes_inherit() {
        let widths = ColumnWidths::from_classes(["trellis-col", "col-sm-6", "col-lg-4"]);
        assert_eq!(widths, ColumnWidths::new(12, 6, 6, 4));

        let widths = ColumnWidths::from_classes(["col-3"]);
        assert_eq!(widths, ColumnWidths::uniform(3));
    }

    #[test]
    fn test_width_classes() {
        assert_eq!(
            ColumnWidths::new(12, 6, 4, 3).classes(),
            vec!["col-12", "col-sm-6", "col-md-4", "col-lg-3"]
        );
        assert!(ColumnWidths::is_width_class("col-md-4"));
        assert!(!ColumnWidths::is_width_class("col-xl-4"));
        assert!(!ColumnWidths::is_width_class("col-13"));
        assert!(!ColumnWidths::is_width_class("trellis-col"));
    }
}
