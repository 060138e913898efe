pub mod input_metrics;
pub mod render;
