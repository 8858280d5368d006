mod check;
mod convert;

pub use check::run_check;
pub use convert::run_convert;
