mod cli;
mod common;
mod context;
mod definition;
mod runner_context;

pub mod prelude {
    pub use crate::cli::SurgeHttpScenarioCli;
    pub use crate::common::{
        connect_http_client, endpoint_url, http_client_config, parse_base_url,
    };
    pub use crate::context::{DefaultScenarioValues, HttpVuContext};
    pub use crate::definition::HttpScenarioDefinitionBuilder;
    pub use crate::runner_context::HttpRunnerContext;

    /// Re-export of the `surge_runner` prelude.
    ///
    /// This is for convenience so that you can depend on a single crate for the runner in your scenarios.
    pub use surge_runner::prelude::*;

    /// Re-export of the instrumented client for convenience.
    pub use http_client_instrumented::prelude::*;
}
