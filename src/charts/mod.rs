//! Named chart slots with one live chart each.
//!
//! A slot is a drawing surface identified by name. `ChartRegistry` owns the
//! live chart of every slot and releases it before anything else may draw
//! there.

pub mod font;
pub mod raster;

pub use raster::RasterBackend;

use crate::error::ChartError;
use indexmap::IndexMap;
use std::fmt;
use tracing::debug;

/// Slot showing the most borrowed books.
pub const BOOK_BORROW_SLOT: &str = "book-borrow";
/// Slot showing borrows per month.
pub const MONTHLY_TREND_SLOT: &str = "monthly-trend";
/// Slot showing the estimated category split.
pub const CATEGORY_SPLIT_SLOT: &str = "category-split";

/// Caption drawn above the chart in slot `name`.
pub fn slot_title(name: &str) -> &str {
    match name {
        BOOK_BORROW_SLOT => "Most borrowed books",
        MONTHLY_TREND_SLOT => "Monthly borrowing trend",
        CATEGORY_SPLIT_SLOT => "Category split (estimated)",
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Bar => write!(f, "bar"),
            ChartKind::Line => write!(f, "line"),
            ChartKind::Pie => write!(f, "pie"),
        }
    }
}

/// Labelled values, drawn in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<u32>,
}

impl ChartData {
    pub fn from_pairs(pairs: &[(String, u32)]) -> Self {
        Self {
            labels: pairs.iter().map(|(label, _)| label.clone()).collect(),
            values: pairs.iter().map(|(_, value)| *value).collect(),
        }
    }

    pub fn from_map(map: &IndexMap<String, u32>) -> Self {
        Self {
            labels: map.keys().cloned().collect(),
            values: map.values().copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_value(&self) -> u32 {
        self.values.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.values.iter().map(|&v| u64::from(v)).sum()
    }
}

/// The drawing surface a slot is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// A live chart drawn on a surface.
pub trait ChartHandle {
    /// Current image as PNG bytes.
    fn snapshot_png(&self) -> Result<Vec<u8>, ChartError>;

    /// Release the drawing resources. Called exactly once per handle.
    fn destroy(&mut self);
}

/// Constructs charts on surfaces.
pub trait ChartBackend {
    type Handle: ChartHandle;

    fn construct(
        &self,
        surface: &Surface,
        kind: ChartKind,
        data: &ChartData,
    ) -> Result<Self::Handle, ChartError>;
}

pub struct ChartRegistry<B: ChartBackend> {
    backend: B,
    width: u32,
    height: u32,
    slots: IndexMap<String, B::Handle>,
}

impl<B: ChartBackend> ChartRegistry<B> {
    pub fn new(backend: B, width: u32, height: u32) -> Self {
        Self {
            backend,
            width,
            height,
            slots: IndexMap::new(),
        }
    }

    /// Draw `data` in slot `name`, destroying the chart already there first.
    ///
    /// If construction fails the slot is left empty.
    pub fn create_or_replace(
        &mut self,
        name: &str,
        kind: ChartKind,
        data: &ChartData,
    ) -> Result<(), ChartError> {
        self.destroy(name);

        let surface = Surface {
            name: name.to_string(),
            width: self.width,
            height: self.height,
        };
        let handle = self.backend.construct(&surface, kind, data)?;
        debug!("Created {} chart in slot '{}'", kind, name);
        self.slots.insert(name.to_string(), handle);
        Ok(())
    }

    /// Destroy the chart in `name`, if any.
    pub fn destroy(&mut self, name: &str) {
        if let Some(mut handle) = self.slots.shift_remove(name) {
            handle.destroy();
            debug!("Destroyed chart in slot '{}'", name);
        }
    }

    pub fn destroy_all(&mut self) {
        for (name, mut handle) in self.slots.drain(..) {
            handle.destroy();
            debug!("Destroyed chart in slot '{}'", name);
        }
    }

    /// PNG image of the live chart in `name`.
    pub fn export(&self, name: &str) -> Result<Vec<u8>, ChartError> {
        self.slots
            .get(name)
            .ok_or_else(|| ChartError::NotFound(name.to_string()))?
            .snapshot_png()
    }

    /// Names of the live slots in creation order.
    pub fn live_slots(&self) -> Vec<String> {
        self.slots.keys().cloned().collect()
    }
}

impl<B: ChartBackend> Drop for ChartRegistry<B> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}
