mod modes;

pub use modes::Modes;
