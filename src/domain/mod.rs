// Domain layer - Dashboard stores and descriptor logic
pub mod chart;
pub mod dashboard;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod table;
pub mod value;
pub mod view;
