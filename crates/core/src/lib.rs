//! Lyrireel Core Library
//!
//! Assembles a gapless, non-repeating timeline of video footage against timed
//! text lines, and renders it by fetching and cutting clips under bounded,
//! per-resource concurrency with retries.

pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod gap_filler;
pub mod ledger;
pub mod lines;
pub mod media;
pub mod normalize;
pub mod planner;
pub mod queues;
pub mod random_fill;
pub mod render;
pub mod scheduler;
pub mod search;
pub mod selector;
pub mod store;
pub mod timeline;
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{get_cache_dir, get_clip_dir, get_output_path, get_stats_path, get_timeline_path};
pub use config::{AssemblyConfig, Config, RenderConfig, SchedulerConfig};
pub use error::{LyrireelError, Result};
pub use format::{format_render_stats, format_timeline_readable, format_timestamp};
pub use ledger::UsedSegmentLedger;
pub use lines::{load_lines, parse_lrc};
pub use media::{ClipFetcher, ClipSubstitutes, Encoder, EncoderInput};
pub use queues::CancelToken;
pub use render::{RenderOutcome, RenderPipeline, RenderStats};
pub use scheduler::{ClipOutput, ClipScheduler, ClipWorker};
pub use search::{FixtureSearch, SearchBackend, SearchBackendConfig, SearchCollaborator};
pub use selector::CandidateSelector;
pub use store::{load_timeline, save_stats, save_timeline};
pub use timeline::TimelineBuilder;
pub use types::{
    Candidate, ClipDownloadResult, ClipDownloadTask, ClipSource, ClipStatus, Segment, TextLine,
    Timeline, TimelineLine,
};
