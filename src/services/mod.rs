pub mod migrator;
pub mod planner;
pub mod summary;

pub use migrator::{execute_all, execute_group, migrate, run_with, Migrator};
pub use planner::{group_rows, plan_all, plan_group, ContentGroup, GroupPlan, RowPlan, TranslationPlan};
pub use summary::{GroupFailure, GroupOutcome, MigrationSummary};
