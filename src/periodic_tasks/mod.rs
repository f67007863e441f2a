mod runner;
mod sync;

pub(crate) use sync::{SyncConfig, SyncTask};
