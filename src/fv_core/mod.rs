pub mod condition;
pub mod flux;
pub mod initial;
pub mod mesh;
pub mod state;
pub mod validation;
