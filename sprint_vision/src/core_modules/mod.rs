pub mod debouncer;
pub mod differencer;
pub mod frame;
pub mod sprint_timer;
pub mod zone;
