//! Codebase comparison, compatibility reports and API
//! level history

pub mod api_levels;
pub mod checker;
pub mod comparator;


pub use api_levels::{ApiClass, ApiElement, ApiHistory};
pub use checker::{CompatibilityChecker, CompatibilityIssue, CompatibilityReport, IssueKind, Severity};
pub use comparator::{CodebaseComparator, CompareContext, ComparisonVisitor};
