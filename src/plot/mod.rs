//! # Plotters
//!
//! The two public entry points of the crate:
//! - [`SingleVectorPlotter`] draws one word's embedding as a bar chart
//! - [`EmbeddingPlotter`] reduces several embeddings to 2-D and draws a
//!   labelled scatter plot
//!
//! Both resolve their font once at construction and create a fresh figure
//! for every call, so a plotter can be shared between threads.

use crate::font::{FontResolver, ResolvedFont};
use anyhow::Context;
use std::fs;
use std::path::Path;

mod embedding;
mod settings;
mod single;

pub use embedding::EmbeddingPlotter;
pub use settings::{PlotSettings, PlotSettingsBuilder, DEFAULT_FONT, DEFAULT_MODEL_LABEL};
pub use single::SingleVectorPlotter;

/// Settings plus the font they point at, resolved once.
#[derive(Debug, Clone)]
struct PlotContext {
    settings: PlotSettings,
    font: ResolvedFont,
}

impl PlotContext {
    fn new(settings: PlotSettings) -> anyhow::Result<Self> {
        let font = FontResolver::resolve(settings.font_path())?;
        Ok(Self { settings, font })
    }
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create output directory {}", parent.display()))?;
    }
    Ok(())
}
