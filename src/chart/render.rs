//! Rasterization of chart models to PNG files.
//!
//! Each [`Figure`] owns its own bitmap for the duration of one draw call.
//! Drawing goes to a staging file next to the target, which replaces the
//! target only after the image was fully rendered. A failed draw leaves the
//! previous artifact, if any, untouched.

use crate::chart::{BarChart, ScatterChart};
use crate::font::{ResolvedFont, POINTS_PER_INCH};
use anyhow::{anyhow, Context};
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

const SERIES_COLOR: RGBColor = RGBColor(31, 119, 180);
const TITLE_POINTS: f64 = 12.0;
const TICK_POINTS: f64 = 10.0;
/// "x-large" relative to a 10pt base.
const ANNOTATION_POINTS: f64 = 14.4;

static STAGING_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Physical size and resolution of a rendered figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureGeometry {
    pub dpi: u32,
    pub size_inches: (f64, f64),
}

impl Default for FigureGeometry {
    fn default() -> Self {
        Self {
            dpi: 150,
            size_inches: (6.4, 4.8),
        }
    }
}

impl FigureGeometry {
    pub fn pixels(&self) -> (u32, u32) {
        let dpi = self.dpi as f64;
        (
            (self.size_inches.0 * dpi).round() as u32,
            (self.size_inches.1 * dpi).round() as u32,
        )
    }

    /// Converts a length in typographic points to whole pixels.
    pub fn points_to_pixels(&self, points: f64) -> u32 {
        (points * self.dpi as f64 / POINTS_PER_INCH).round().max(1.0) as u32
    }

    /// Radius in pixels of a dot whose marker size is `area` square points.
    pub fn marker_radius(&self, area: f64) -> u32 {
        self.points_to_pixels(area.max(0.0).sqrt() / 2.0)
    }
}

/// A single-use drawing surface targeting one PNG file.
pub struct Figure<'a> {
    path: &'a Path,
    geometry: FigureGeometry,
    font: &'a ResolvedFont,
}

type Root<'b> = DrawingArea<BitMapBackend<'b>, Shift>;

impl<'a> Figure<'a> {
    pub fn new(path: &'a Path, geometry: FigureGeometry, font: &'a ResolvedFont) -> Self {
        Self {
            path,
            geometry,
            font,
        }
    }

    pub fn draw_bar_chart(self, chart: &BarChart) -> anyhow::Result<()> {
        let geometry = self.geometry;
        let font = self.font;
        self.commit(|root| {
            root.fill(&WHITE)?;

            let title_style = font.desc(TITLE_POINTS, geometry.dpi, FontStyle::Normal);
            let (first, rest) = chart
                .title
                .split_first()
                .ok_or_else(|| anyhow!("Bar chart has no title"))?;
            let mut area = root.titled(first, title_style.clone())?;
            for line in rest {
                area = area.titled(line, title_style.clone())?;
            }

            let mut ctx = ChartBuilder::on(&area)
                .margin(geometry.points_to_pixels(6.0))
                .x_label_area_size(geometry.points_to_pixels(16.0))
                .y_label_area_size(geometry.points_to_pixels(32.0))
                .build_cartesian_2d(chart.x_range(), chart.y_range())?;

            ctx.configure_mesh()
                .disable_mesh()
                .label_style(font.desc(TICK_POINTS, geometry.dpi, FontStyle::Normal))
                .x_label_formatter(&|x| format!("{:.0}", x))
                .draw()?;

            ctx.draw_series(chart.bars.iter().map(|bar| {
                let span = bar.span();
                Rectangle::new(
                    [(span.start, 0.0), (span.end, bar.height)],
                    SERIES_COLOR.filled(),
                )
            }))?;
            Ok(())
        })
    }

    /// Draws every point as a dot of `marker_size` square points with its
    /// label in large bold type.
    pub fn draw_scatter_chart(self, chart: &ScatterChart, marker_size: f64) -> anyhow::Result<()> {
        let geometry = self.geometry;
        let font = self.font;
        self.commit(|root| {
            root.fill(&WHITE)?;

            let mut ctx = ChartBuilder::on(root)
                .margin(geometry.points_to_pixels(6.0))
                .x_label_area_size(geometry.points_to_pixels(16.0))
                .y_label_area_size(geometry.points_to_pixels(32.0))
                .build_cartesian_2d(chart.x_range(), chart.y_range())?;

            ctx.configure_mesh()
                .disable_mesh()
                .label_style(font.desc(TICK_POINTS, geometry.dpi, FontStyle::Normal))
                .draw()?;

            let radius = geometry.marker_radius(marker_size);
            ctx.draw_series(
                chart
                    .points
                    .iter()
                    .map(|p| Circle::new((p.x, p.y), radius, SERIES_COLOR.filled())),
            )?;

            let label_style = font
                .desc(ANNOTATION_POINTS, geometry.dpi, FontStyle::Bold)
                .color(&BLACK)
                .pos(Pos::new(HPos::Left, VPos::Bottom));
            ctx.draw_series(chart.points.iter().map(|p| {
                Text::new(p.label.clone(), chart.label_anchor(p), label_style.clone())
            }))?;
            Ok(())
        })
    }

    /// Renders through `draw` into a staging file and moves it over the target
    /// on success. The bitmap is dropped before returning on every path.
    fn commit<F>(self, draw: F) -> anyhow::Result<()>
    where
        F: FnOnce(&Root<'_>) -> anyhow::Result<()>,
    {
        let staging = staging_path(self.path)?;

        let root = BitMapBackend::new(&staging, self.geometry.pixels()).into_drawing_area();
        let outcome = draw(&root).and_then(|()| root.present().map_err(Into::into));
        drop(root);

        match outcome {
            Ok(()) => {
                fs::rename(&staging, self.path).with_context(|| {
                    format!("Failed to move rendered plot to {}", self.path.display())
                })?;
                debug!("Rendered {}", self.path.display());
                Ok(())
            }
            Err(e) => {
                // The backend flushes on drop; discard whatever it wrote.
                let _ = fs::remove_file(&staging);
                Err(e.context(format!("Failed to render {}", self.path.display())))
            }
        }
    }
}

// Keeps the `.png` extension, which selects the encoder.
fn staging_path(target: &Path) -> anyhow::Result<PathBuf> {
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Output path {} has no file name", target.display()))?;
    let n = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ok(target.with_file_name(format!(
        ".{}.{}-{}.png",
        file_name,
        std::process::id(),
        n
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let geometry = FigureGeometry::default();
        assert_eq!(geometry.pixels(), (960, 720));
        assert_eq!(geometry.points_to_pixels(72.0), 150);
    }

    #[test]
    fn test_marker_radius() {
        let geometry = FigureGeometry::default();
        // sqrt(20) / 2 pt at 150 dpi
        assert_eq!(geometry.marker_radius(20.0), 5);
        assert_eq!(geometry.marker_radius(0.0), 1);
    }

    #[test]
    fn test_staging_path_stays_beside_target() {
        let target = Path::new("/srv/static/tsneplots/user_abc.png");
        let staging = staging_path(target).unwrap();

        assert_eq!(staging.parent(), target.parent());
        assert_eq!(staging.extension().and_then(|e| e.to_str()), Some("png"));
        assert_ne!(staging, target);
        assert_ne!(staging_path(target).unwrap(), staging);
    }
}
