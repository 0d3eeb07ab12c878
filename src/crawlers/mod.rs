pub mod crawler;
pub mod library;
pub mod web;

pub use crawler::{FetchStrategy, StrategyChain};
