pub mod ai;
pub mod erase;
pub mod geometry;
pub mod render;
pub mod text;
