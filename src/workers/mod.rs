pub mod relay_gc;

pub use relay_gc::RelayGcWorker;
