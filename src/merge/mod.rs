//! Partial-patch merging for records.

mod merge;

pub use merge::{deep_merge, merge_record, shallow_merge, MergeStrategy};
