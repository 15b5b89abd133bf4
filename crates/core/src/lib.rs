pub mod cache;
pub mod config;
pub mod consensus;
pub mod describer;
pub mod error;
pub mod format;
pub mod media;
pub mod oracle;
pub mod payload;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod run;
pub mod sampler;
pub mod sections;
pub mod types;
pub mod validator;

pub use cache::{
    ReportKey, get_cache_dir, get_report_path, get_root_cache_dir, load_report, save_report,
};
pub use config::AnalysisConfig;
pub use consensus::{VotePolicy, aggregate};
pub use error::{DashguardError, Result};
pub use format::{format_report_readable, format_timestamp};
pub use media::probe_duration;
pub use oracle::{ChatCompletionsOracle, InferenceRequest, Oracle, OracleError, ResponseMode};
pub use payload::VideoPayload;
pub use pipeline::{Analyzer, ProgressSink, RunState};
pub use prompts::PromptTemplates;
pub use provider::{OracleSettings, Provider, ProviderConfig};
pub use run::{CompletedRun, RunOutcome, RunSnapshot, RunSupervisor, RunTicket};
pub use sections::sectionize;
pub use types::{
    AggregatedResult, Report, SectionDescription, SectionName, SectionStatus, Timeline,
    ValidatedEstimate, Verdict, VideoSection,
};
pub use validator::{Rejection, validate};
