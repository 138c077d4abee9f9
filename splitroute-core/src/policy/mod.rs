pub mod classifier;
pub mod guard;
pub mod selector;
