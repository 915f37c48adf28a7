pub mod bookings;
pub mod dto;
pub mod health;
pub mod inquiries;
pub mod offers;

pub use bookings::*;
pub use health::*;
pub use inquiries::*;
pub use offers::*;
