pub mod asset_matrix;
pub mod bank;
pub mod default_set;
pub mod error;
pub mod leverage;
pub mod matrix;
