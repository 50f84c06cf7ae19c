use std::fmt;

// An enum for all possible modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modes {
    Sampler,
    Merger,
    Splitter,
}

impl fmt::Display for Modes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modes::Sampler => "sampler",
            Modes::Merger => "merger",
            Modes::Splitter => "splitter",
        };
        write!(f, "{}", name)
    }
}
