pub mod finder;
pub mod screenshot;
pub mod traits;
