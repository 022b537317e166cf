//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod condition;
pub mod condition_eval;
pub mod strategy;
pub mod block_parser;
pub mod simulation;
pub mod metrics;
pub mod backtest;
pub mod config_validation;
pub mod error;
