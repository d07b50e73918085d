//! Service layer: progress reporting and transient resource handles

pub mod handles;
pub mod progress;

pub use handles::{BlobArena, BlobHandle};
pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, PipelineState, ProgressReporter,
    ProgressTracker, ProgressUpdate, StageBudget,
};
