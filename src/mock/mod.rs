pub mod builder;
pub mod environment;
pub mod handle;

pub use builder::MockBuilder;
pub use environment::MockEnvironment;
pub use handle::{MockGuard, MockHandle};
