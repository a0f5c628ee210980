pub mod core;
pub mod ray;
pub mod grid;
pub mod encoding;
pub mod chain;
pub mod linkage;
pub mod rules;
pub mod commit;
pub mod validate;
pub mod config;
pub mod solver;
pub mod debug;
pub mod bench;
