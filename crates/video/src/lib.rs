pub mod debug;
pub mod discover;
pub mod error;
pub mod extract;
pub mod frames;
pub mod layout;
pub mod methods;
pub mod probe;
pub mod runner;

pub use debug::{DebugEvent, DebugPlan, DebugStage, DebugVerdict, debug_video, remove_scratch};
pub use discover::find_recent_upload;
pub use error::VideoError;
pub use extract::{ExtractionTiming, SpeedGrade, time_extraction};
pub use frames::{clear_frames, count_frames, list_frames};
pub use layout::{ContainerLayout, MoovPlacement, TopLevelBox};
pub use methods::{
    ExtractionMethod, METHODS, MethodEvent, MethodOutcome, MethodReport, build_command,
    prepare_output_dir, run_method, successful_methods, try_methods,
};
pub use probe::{ProbeReport, ProbeSummary, analyze, file_size, format_size};
pub use runner::{CapturedOutput, CommandSpec, Tools, log_tail, run_captured};
