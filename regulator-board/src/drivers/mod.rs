pub mod analog;
pub mod flash;
pub mod tick_timer;
