pub mod suppression;

pub use suppression::MinCellPolicy;
