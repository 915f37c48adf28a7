pub mod aggregator;
pub mod compatibility;
pub mod coordinator;
pub mod line_items;
pub mod workflow;

pub use aggregator::*;
pub use compatibility::*;
pub use coordinator::*;
pub use line_items::*;
pub use workflow::*;
