pub mod constraints;
pub mod field;
pub mod frontier;
pub mod mask;
pub mod models;
pub mod polar;
pub mod propagator;
pub mod routemap;
