pub mod result;
pub mod selector;
pub mod state;
pub mod timer;
