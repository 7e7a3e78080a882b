//! lifelens-ingest: loaders that turn exported data files (CSV/JSON) into
//! the core record types, plus the deterministic journal-task sanitizer.

pub mod export;
pub mod journal;

pub use export::load_dir;
pub use journal::{JournalTask, RawJournalTask, normalize_time, sanitize_json, sanitize_tasks};
