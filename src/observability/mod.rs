pub mod middleware;
pub mod tracing;

pub use self::middleware::*;
pub use self::tracing::*;
