mod fs;
mod paths;

pub use fs::write_atomic;
pub use paths::{AppPaths, AppPathsError};
