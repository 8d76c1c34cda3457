use super::{ensure_parent_dir, PlotContext, PlotSettings};
use crate::chart::{BarChart, Figure};
use crate::naming::{artifact_path, word_hash, ArtifactKind};
use log::info;
use num_traits::ToPrimitive;
use std::path::PathBuf;

/// Renders one embedding vector as a bar chart.
#[derive(Debug, Clone)]
pub struct SingleVectorPlotter {
    context: PlotContext,
}

impl SingleVectorPlotter {
    /// Fails if the configured font cannot be loaded.
    pub fn new(settings: PlotSettings) -> anyhow::Result<Self> {
        Ok(Self {
            context: PlotContext::new(settings)?,
        })
    }

    pub fn settings(&self) -> &PlotSettings {
        &self.context.settings
    }

    /// Writes `<root>/static/singleplots/<model_name>_<md5(word)>.png`,
    /// replacing any earlier plot of the same word and model.
    ///
    /// Input is validated before anything touches the filesystem: an empty
    /// word, an empty vector or a non-finite component is an error.
    pub fn plot<T: ToPrimitive>(
        &self,
        word: &str,
        model_name: &str,
        vector: &[T],
    ) -> anyhow::Result<PathBuf> {
        let settings = &self.context.settings;
        let chart = BarChart::from_vector(word, settings.model_label(), model_name, vector)?;
        let path = artifact_path(
            settings.static_root(),
            ArtifactKind::SingleVector,
            model_name,
            &word_hash(word),
        )?;

        ensure_parent_dir(&path)?;
        Figure::new(&path, settings.geometry(), &self.context.font).draw_bar_chart(&chart)?;

        info!(
            "Wrote {}-component bar chart for {:?} to {}",
            chart.bars.len(),
            word,
            path.display()
        );
        Ok(path)
    }
}
