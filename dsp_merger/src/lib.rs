mod merge;
mod merger;

pub use merge::MergeReport;
pub use merger::TreeMerger;
