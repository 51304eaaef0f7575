pub mod filter;
pub mod timer;
pub mod tree;
