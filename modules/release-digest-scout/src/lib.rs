pub mod digest;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod sources;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
