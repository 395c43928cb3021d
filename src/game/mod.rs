pub mod end_detector;
pub mod error;
pub mod gameplay;
pub mod judgment;
pub mod noise;
pub mod note;
pub mod parsing;
pub mod penalty;
pub mod scheduler;
pub mod scores;
pub mod stage_stats;
pub mod timing_windows;
