#![forbid(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod commands;
pub mod export;
pub mod extract;
pub mod keywords;
pub mod logging;
pub mod source;
pub mod video_id;
pub mod youtube;

pub use extract::{
    CommentRecord, ExtractionAborted, ExtractionConfig, ExtractionFilters, ExtractionOutcome,
    Extractor, RunStats, extract,
};
pub use source::{CommentPage, CommentSource, RawComment, SourceError, VideoMetadata};
pub use video_id::VideoId;
