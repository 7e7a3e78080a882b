//! lifelens-core: aggregation-and-inference engine for per-user behavioral
//! records. Pure and synchronous; all IO lives behind the `DataSource` seam.

pub mod daily;
pub mod effects;
pub mod findings;
pub mod plan;
pub mod plan_context;
pub mod snapshot;
pub mod source;
pub mod sufficiency;
pub mod time;

pub use daily::{DayRecord, RawRows, aggregate_daily};
pub use effects::{
    Correlation, EffectStatus, HabitEffect, MeanDiff, MentalEffect, OutcomeMetric, diff_of_means,
    habit_effects, mean, mental_effects, pearson, std_dev,
};
pub use findings::{Finding, FindingKind, Impact, ImpactDirection, rule_findings};
pub use plan::{
    Allocation, AllocatorPolicy, CandidateItem, DuplicateRule, PlanHorizon, PlanVerdict,
    RawCandidate, RejectionCounts, SubstringRule, WorkloadDay, allocate, normalize_title,
    sanitize_candidate,
};
pub use plan_context::{PlanContext, build_plan_context, estimate_hours};
pub use snapshot::{
    FinanceOverview, GoalsOverview, InsightSnapshot, Stats, TasksOverview, build_survey,
};
pub use source::{
    AnswerRecord, DataSource, GoalHorizon, GoalRecord, HabitDef, HabitEntry, ImportanceTier,
    MemorySource, MoodRecord, QuestionDef, TaskRecord, TransactionKind, TransactionRecord,
    UserProfile,
};
pub use sufficiency::{BASIC_MIN_DAYS, CORRELATION_MIN_DAYS, Sufficiency, assess};
pub use time::{DateWindow, Period, day_key, parse_local_to_utc, safe_num, time_bucket};
