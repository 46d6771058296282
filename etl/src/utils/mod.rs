pub mod pool;
pub mod retry;
pub mod time;
