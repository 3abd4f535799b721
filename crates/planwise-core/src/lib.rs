//! Coverage and suggestion engine.
//!
//! ```text
//! CurriculumStore --outcome_links--> coverage::classify_coverage --> [OutcomeCoverage]
//!        |
//!        +--planning_snapshot--> suggest::rank_suggestions --> [Suggestion]
//!                                   (classifies the snapshot's links itself)
//! ```
//!
//! Both entry points are read-only. Coverage status is recomputed on every
//! call and never stored.

pub mod coverage;
pub mod error;
pub mod store;
pub mod suggest;
pub mod week;

pub use coverage::{CoverageStatus, CoverageSummary, OutcomeCoverage, classify_coverage};
pub use error::EngineError;
pub use planwise_db::queries::coverage::CoverageFilter;
pub use store::{CurriculumStore, MemoryStore, PgStore};
pub use suggest::{Suggestion, SuggestionCategory, rank_suggestions};
pub use week::PlanningWeek;
