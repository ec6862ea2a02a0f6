pub mod assets;
pub mod generation;
