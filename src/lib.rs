pub mod builder;
pub mod cli;
pub mod config;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod text;
pub mod tree;
pub mod util;
