mod split;
mod splitter;

pub use split::{collect_class_images, split_point};
pub use splitter::{ClassSplit, RatioSplitter, SplitConfig, SplitReport};
