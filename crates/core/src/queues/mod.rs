pub mod cancel;
pub mod task_queue;

pub use cancel::*;
pub use task_queue::*;
