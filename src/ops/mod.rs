pub mod canvas_ops;
pub mod fill;
pub mod shapes;
pub mod strokes;
pub mod text;
