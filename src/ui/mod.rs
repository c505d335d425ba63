pub mod normalizer;
pub mod plot;
pub mod prompt;
pub mod review;
