use crate::chart::FigureGeometry;
use crate::dimred::Tsne;
use std::path::{Path, PathBuf};

/// Font used for titles and labels, relative to the static root.
pub const DEFAULT_FONT: &str = "static/fonts/google-droid/DroidSans-Bold.ttf";

/// Localized caption placed before the model name in bar chart titles.
pub const DEFAULT_MODEL_LABEL: &str = "модель";

/// Everything the plotters need from the surrounding application.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSettings {
    static_root: PathBuf,
    font_path: PathBuf,
    geometry: FigureGeometry,
    model_label: String,
    marker_size: f64,
    label_offset: f64,
    tsne: Tsne,
}

impl PlotSettings {
    pub fn builder() -> PlotSettingsBuilder {
        PlotSettingsBuilder::new()
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    pub fn font_path(&self) -> &Path {
        &self.font_path
    }

    pub fn geometry(&self) -> FigureGeometry {
        self.geometry
    }

    pub fn model_label(&self) -> &str {
        &self.model_label
    }

    pub fn marker_size(&self) -> f64 {
        self.marker_size
    }

    pub fn label_offset(&self) -> f64 {
        self.label_offset
    }

    pub fn tsne(&self) -> &Tsne {
        &self.tsne
    }
}

/// Builder for [`PlotSettings`].
///
/// # Example Usage
/// ```ignore
/// let settings = PlotSettingsBuilder::new()
///     .static_root("/home/sites/example/")
///     .dpi(150)
///     .build();
/// ```
pub struct PlotSettingsBuilder {
    static_root: PathBuf,
    font_path: Option<PathBuf>,
    geometry: FigureGeometry,
    model_label: String,
    marker_size: f64,
    label_offset: f64,
    tsne: Tsne,
}

impl Default for PlotSettingsBuilder {
    fn default() -> Self {
        Self {
            static_root: PathBuf::from("."),
            font_path: None,
            geometry: FigureGeometry::default(),
            model_label: DEFAULT_MODEL_LABEL.to_string(),
            marker_size: 20.0,
            label_offset: -20.0,
            tsne: Tsne::default(),
        }
    }
}

impl PlotSettingsBuilder {
    /// Creates a new builder with default parameters.
    ///
    /// Default values:
    /// - `static_root`: current directory
    /// - `font_path`: `<static_root>/static/fonts/google-droid/DroidSans-Bold.ttf`
    /// - `dpi`: 150, `figure_size`: 6.4 × 4.8 inches
    /// - `model_label`: "модель"
    /// - `marker_size`: 20 square points
    /// - `label_offset`: -20 data units
    /// - `tsne`: perplexity 5.0, 500 epochs
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory containing `static/`, under which plots are written.
    pub fn static_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.static_root = root.into();
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.geometry.dpi = dpi;
        self
    }

    /// Figure width and height in inches.
    pub fn figure_size(mut self, width: f64, height: f64) -> Self {
        self.geometry.size_inches = (width, height);
        self
    }

    pub fn model_label(mut self, label: impl Into<String>) -> Self {
        self.model_label = label.into();
        self
    }

    pub fn marker_size(mut self, marker_size: f64) -> Self {
        self.marker_size = marker_size;
        self
    }

    pub fn label_offset(mut self, offset: f64) -> Self {
        self.label_offset = offset;
        self
    }

    pub fn tsne(mut self, tsne: Tsne) -> Self {
        self.tsne = tsne;
        self
    }

    pub fn build(self) -> PlotSettings {
        let font_path = self
            .font_path
            .unwrap_or_else(|| self.static_root.join(DEFAULT_FONT));
        PlotSettings {
            static_root: self.static_root,
            font_path,
            geometry: self.geometry,
            model_label: self.model_label,
            marker_size: self.marker_size,
            label_offset: self.label_offset,
            tsne: self.tsne,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimred::{Reducer, TsneBuilder};

    #[test]
    fn test_defaults() {
        let settings = PlotSettings::builder().static_root("/srv/site").build();

        assert_eq!(settings.static_root(), Path::new("/srv/site"));
        assert_eq!(
            settings.font_path(),
            Path::new("/srv/site/static/fonts/google-droid/DroidSans-Bold.ttf")
        );
        assert_eq!(settings.geometry().dpi, 150);
        assert_eq!(settings.geometry().pixels(), (960, 720));
        assert_eq!(settings.model_label(), "модель");
        assert_eq!(settings.marker_size(), 20.0);
        assert_eq!(settings.label_offset(), -20.0);
        assert_eq!(settings.tsne().epochs(), 500);
        assert_eq!(settings.tsne().perplexity(), 5.0);
        assert_eq!(settings.tsne().output_dim(), 2);
    }

    #[test]
    fn test_overrides() {
        let settings = PlotSettings::builder()
            .static_root("/srv/site")
            .font_path("/usr/share/fonts/custom.ttf")
            .dpi(72)
            .figure_size(10.0, 5.0)
            .model_label("model")
            .tsne(TsneBuilder::new().perplexity(2.0).build())
            .build();

        assert_eq!(settings.font_path(), Path::new("/usr/share/fonts/custom.ttf"));
        assert_eq!(settings.geometry().pixels(), (720, 360));
        assert_eq!(settings.model_label(), "model");
        assert_eq!(settings.tsne().perplexity(), 2.0);
    }
}
