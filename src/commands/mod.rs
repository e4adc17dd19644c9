pub mod matrix;
pub mod serve;
