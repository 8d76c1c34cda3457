//! # Chart Models
//!
//! Plain descriptions of what a plot contains, built and validated before
//! anything is rasterized. Rendering lives in [`render`].

use crate::naming::display_label;
use crate::utils::{padded_range, to_finite_f64};
use anyhow::bail;
use ndarray::ArrayView2;
use num_traits::ToPrimitive;
use std::ops::Range;

pub mod render;

pub use render::{Figure, FigureGeometry};

/// Width of each bar, in x-axis units.
pub const BAR_WIDTH: f64 = 0.8;

const AXIS_PADDING: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub x: usize,
    pub height: f64,
}

impl Bar {
    /// Horizontal extent of the bar, centred on its x-location.
    pub fn span(&self) -> Range<f64> {
        let centre = self.x as f64;
        (centre - BAR_WIDTH / 2.0)..(centre + BAR_WIDTH / 2.0)
    }
}

/// Bar chart of one embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: Vec<String>,
    pub bars: Vec<Bar>,
}

impl BarChart {
    /// One bar per vector component, titled with the word's display label
    /// above `"<model_label> <model_name>"`.
    pub fn from_vector<T: ToPrimitive>(
        word: &str,
        model_label: &str,
        model_name: &str,
        vector: &[T],
    ) -> anyhow::Result<Self> {
        if word.is_empty() {
            bail!("Word must not be empty");
        }
        if vector.is_empty() {
            bail!("Cannot plot an empty vector for word {:?}", word);
        }
        let heights = to_finite_f64(vector)?;

        let bars = heights
            .into_iter()
            .enumerate()
            .map(|(x, height)| Bar { x, height })
            .collect();

        Ok(Self {
            title: vec![
                display_label(word).to_string(),
                format!("{} {}", model_label, model_name),
            ],
            bars,
        })
    }

    pub fn x_range(&self) -> Range<f64> {
        let last = self.bars.len().saturating_sub(1) as f64;
        (-BAR_WIDTH)..(last + BAR_WIDTH)
    }

    pub fn y_range(&self) -> Range<f64> {
        padded_range(self.bars.iter().map(|b| b.height), AXIS_PADDING, true)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPoint {
    pub label: String,
    pub x: f64,
    pub y: f64,
}

/// Scatter plot of reduced embeddings, one annotated point per word.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterChart {
    pub points: Vec<LabeledPoint>,
    /// Horizontal shift of each label from its point, in data units.
    pub label_offset: f64,
}

impl ScatterChart {
    pub fn new<S: AsRef<str>>(
        words: &[S],
        coords: ArrayView2<f64>,
        label_offset: f64,
    ) -> anyhow::Result<Self> {
        if coords.ncols() != 2 {
            bail!(
                "Scatter plot needs 2-d coordinates, got {} columns",
                coords.ncols()
            );
        }
        if coords.nrows() != words.len() {
            bail!(
                "Got {} words but {} coordinate rows",
                words.len(),
                coords.nrows()
            );
        }

        let points = words
            .iter()
            .zip(coords.rows())
            .map(|(word, row)| LabeledPoint {
                label: display_label(word.as_ref()).to_string(),
                x: row[0],
                y: row[1],
            })
            .collect();

        Ok(Self {
            points,
            label_offset,
        })
    }

    /// Where the label of `point` is anchored.
    pub fn label_anchor(&self, point: &LabeledPoint) -> (f64, f64) {
        (point.x + self.label_offset, point.y)
    }

    /// X range covering every point and every label anchor.
    pub fn x_range(&self) -> Range<f64> {
        let xs = self
            .points
            .iter()
            .flat_map(|p| [p.x, p.x + self.label_offset]);
        padded_range(xs, AXIS_PADDING, false)
    }

    pub fn y_range(&self) -> Range<f64> {
        padded_range(self.points.iter().map(|p| p.y), AXIS_PADDING * 2.0, false)
    }
}
