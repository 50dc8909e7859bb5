/// Log files as ordered collections of lazily parsed lines

pub mod line;
pub mod log;

pub use line::Line;
pub use log::Log;
