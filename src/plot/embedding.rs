use super::{ensure_parent_dir, PlotContext, PlotSettings};
use crate::chart::{Figure, ScatterChart};
use crate::dimred::{Reducer, Tsne};
use crate::naming::{artifact_path, words_hash, ArtifactKind};
use crate::utils::{ensure_finite, to_finite_f64};
use anyhow::bail;
use log::info;
use ndarray::{Array2, ArrayView2};
use num_traits::ToPrimitive;
use std::path::PathBuf;

/// Projects several embeddings onto the plane and renders them as a
/// labelled scatter plot.
#[derive(Debug, Clone)]
pub struct EmbeddingPlotter<R = Tsne> {
    context: PlotContext,
    reducer: R,
}

impl EmbeddingPlotter<Tsne> {
    /// Uses the t-SNE reducer configured in `settings`. Fails if the font
    /// cannot be loaded.
    pub fn new(settings: PlotSettings) -> anyhow::Result<Self> {
        let reducer = settings.tsne().clone();
        Self::with_reducer(settings, reducer)
    }
}

impl<R: Reducer> EmbeddingPlotter<R> {
    pub fn with_reducer(settings: PlotSettings, reducer: R) -> anyhow::Result<Self> {
        Ok(Self {
            context: PlotContext::new(settings)?,
            reducer,
        })
    }

    pub fn settings(&self) -> &PlotSettings {
        &self.context.settings
    }

    pub fn reducer(&self) -> &R {
        &self.reducer
    }

    /// Writes `<root>/static/tsneplots/<user_model>_<md5(words joined by _)>.png`.
    ///
    /// `matrix` holds one row per word, in the same order. Shapes, finiteness
    /// and the model identifier are checked before the reduction runs.
    pub fn plot<S: AsRef<str>>(
        &self,
        words: &[S],
        matrix: ArrayView2<f64>,
        user_model: &str,
    ) -> anyhow::Result<PathBuf> {
        let settings = &self.context.settings;

        if words.len() != matrix.nrows() {
            bail!(
                "Got {} words but the matrix has {} rows",
                words.len(),
                matrix.nrows()
            );
        }
        if words.len() < 2 {
            bail!("Need at least 2 words to plot an embedding, got {}", words.len());
        }
        if let Some(i) = words.iter().position(|w| w.as_ref().is_empty()) {
            bail!("Word at position {} is empty", i);
        }
        ensure_finite(matrix)?;

        let path = artifact_path(
            settings.static_root(),
            ArtifactKind::Embedding,
            user_model,
            &words_hash(words),
        )?;

        let coords = self.reducer.reduce(matrix)?;
        let chart = ScatterChart::new(words, coords.view(), settings.label_offset())?;

        ensure_parent_dir(&path)?;
        Figure::new(&path, settings.geometry(), &self.context.font)
            .draw_scatter_chart(&chart, settings.marker_size())?;

        info!(
            "Wrote {}-word embedding plot to {}",
            chart.points.len(),
            path.display()
        );
        Ok(path)
    }

    /// Like [`plot`](Self::plot), taking one vector per word. All vectors
    /// must share one length.
    pub fn plot_rows<S, V, T>(
        &self,
        words: &[S],
        rows: &[V],
        user_model: &str,
    ) -> anyhow::Result<PathBuf>
    where
        S: AsRef<str>,
        V: AsRef<[T]>,
        T: ToPrimitive,
    {
        let matrix = rows_to_matrix(rows)?;
        self.plot(words, matrix.view(), user_model)
    }
}

fn rows_to_matrix<V, T>(rows: &[V]) -> anyhow::Result<Array2<f64>>
where
    V: AsRef<[T]>,
    T: ToPrimitive,
{
    let n_dim = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
    let mut values = Vec::with_capacity(rows.len() * n_dim);
    for (i, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != n_dim {
            bail!(
                "Row {} has {} components, expected {} like row 0",
                i,
                row.len(),
                n_dim
            );
        }
        values.extend(to_finite_f64(row)?);
    }
    Ok(Array2::from_shape_vec((rows.len(), n_dim), values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rows_to_matrix() {
        let rows = vec![vec![1.0f32, 2.0], vec![3.0, 4.0]];
        let matrix = rows_to_matrix(&rows).unwrap();
        assert_eq!(matrix, array![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn test_rows_to_matrix_rejects_ragged_rows() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(rows_to_matrix(&rows).is_err());
    }

    #[test]
    fn test_missing_font_fails_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PlotSettings::builder()
            .static_root(dir.path())
            .font_path(dir.path().join("missing.ttf"))
            .build();

        assert!(EmbeddingPlotter::new(settings).is_err());
    }
}
