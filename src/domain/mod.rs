pub mod booking;
pub mod inquiry;
pub mod money;
pub mod offer;

pub use booking::*;
pub use inquiry::*;
pub use money::*;
pub use offer::*;
