//! VQA dataset analysis library
//!
//! Tools for analysing a question-answering dataset before model evaluation:
//! label distributions, answer vocabulary coverage, category balance and a
//! small latency/accuracy benchmark of external VQA models.

pub mod analysis;
pub mod benchmark;
pub mod config;
pub mod dataset;
pub mod error;
pub mod images;
pub mod models;
pub mod report;
