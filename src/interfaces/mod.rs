//! Input and output adapters for the command-line driver.

pub mod csv;
pub mod seed;
