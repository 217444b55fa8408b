mod cli;
mod context;
mod definition;
mod duration;
mod executor;
mod monitor;
mod progress;
mod run;
mod shutdown;
mod types;

pub use cli::parse_vu_behaviour;
pub use duration::parse_duration;

pub mod prelude {
    pub use crate::cli::{ReporterOpt, SurgeScenarioCli};
    pub use crate::context::UserValuesConstraint;
    pub use crate::context::{RunnerContext, VuContext};
    pub use crate::definition::{
        HookResult, ScenarioDefinitionBuilder, DEFAULT_BEHAVIOUR, DEFAULT_GRACEFUL_STOP,
    };
    pub use crate::executor::Executor;
    pub use crate::run::{run, RunOutcome, ThresholdsBreachedError};
    pub use crate::types::SurgeResult;

    pub use surge_core::prelude::{DelegatedShutdownListener, ShutdownSignalError, VuBailError};
    pub use surge_instruments::prelude::{
        report_operation, OperationRecord, ReportConfig, Reporter, RunReport, RunStats,
        HTTP_REQ_OPERATION,
    };
}
