pub mod barrier;
pub mod frame;
pub mod scheduler;
pub mod transport;
pub mod worker;
