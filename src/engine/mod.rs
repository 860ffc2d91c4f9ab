//! Engine module - resolving instructions against a live page
//!
//! Strategy chains, the instruction executor and the page observer.

pub mod executor;
pub mod observer;
pub mod strategy;

pub use executor::InstructionExecutor;
pub use observer::{FormDescriptor, PageObserver, PageSummary};
pub use strategy::{ChainOutcome, Strategy, StrategyChain};
