mod constants;
mod event;
mod geo;
mod participant;
mod procession;
mod route;
mod segments;
mod time;

pub use constants::*;
pub use event::*;
pub use geo::*;
pub use participant::*;
pub use procession::*;
pub use route::*;
pub use segments::*;
pub use time::*;
