mod blockchain;
mod sync;
mod task;

pub use blockchain::*;
pub use sync::*;
pub use task::*;
