pub mod math;
pub mod coords;
pub mod box_;
pub mod sphere;
pub mod error;
pub mod config;
pub mod fpoly;
pub mod model;
pub mod bsp;
pub mod csg;
pub mod brush;

#[cfg(feature = "python")]
mod python;

pub use config::{BuildOptions, EBspOptimization};
pub use error::{BspError, BuildReport, EBuildErrorKind};
