//! Model and material loading

mod material;
mod model;

pub use material::*;
pub use model::*;
