pub mod chart;
pub mod dimred;
pub mod font;
pub mod naming;
pub mod plot;
mod utils;

pub use dimred::{Reducer, Tsne, TsneBuilder, TsneMethod};
pub use naming::{content_hash, display_label};
pub use plot::{EmbeddingPlotter, PlotSettings, PlotSettingsBuilder, SingleVectorPlotter};
