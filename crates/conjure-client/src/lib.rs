pub use error::Error;
pub use solver::{Pin, PipSolver};
pub use wheel::WheelClient;

mod error;
mod solver;
mod wheel;
