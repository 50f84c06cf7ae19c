mod output;

pub use output::{MergerOutput, ModeOutput, Output, SamplerOutput, SplitterOutput};
