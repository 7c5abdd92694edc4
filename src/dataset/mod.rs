mod convert;
mod download;

pub use convert::{ConvertSummary, DatasetConverter, SplitSummary, SPLITS};
pub use download::download;
