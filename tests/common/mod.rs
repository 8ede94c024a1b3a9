// tests/common/mod.rs

pub use taskdag_test_utils::{builders, graph, pools};
pub use taskdag_test_utils::{init_tracing, with_timeout};
