//! Dataset analysis
//!
//! ## Modules
//!
//! - `aggregate` - Grouping, percentages and label distributions
//! - `balance` - Named category balance with counting overlap
//! - `coverage` - Answer vocabulary coverage (unique, question-level, per category)

pub mod aggregate;
pub mod balance;
pub mod coverage;

pub use aggregate::{aggregate, pct, semantic_within, CategoryCounts, DistributionReport, DistributionRow, ExampleQuestion};
pub use balance::{BalanceFlag, BalancePlan, BalanceReport, BalanceRow, CategoryPredicate, OverlapRow};
pub use coverage::{top_uncovered, Category, CoverageReport, CoverageResult, UncoveredAnswer, DEFAULT_TOP_UNCOVERED};
