//! Geometry kernel: value types, arc reconstruction, apertures and contour
//! classification.

pub mod aperture;
pub mod arc;
pub mod polarity;
pub mod region;
pub mod types;
pub mod vendor;

pub use aperture::*;
pub use arc::*;
pub use polarity::*;
pub use region::*;
pub use types::*;
pub use vendor::*;
