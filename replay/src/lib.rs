pub mod batch;
pub mod clock;
pub mod log;
pub mod sink;
pub mod speed;
pub mod stats;
