use std::collections::HashMap;
use std::fmt::Debug;

use anyhow::Context;
use http_client_instrumented::prelude::HttpClient;
use surge_runner::prelude::UserValuesConstraint;

#[derive(Debug, Default)]
pub struct DefaultScenarioValues {
    pub values: HashMap<String, String>,
}

impl UserValuesConstraint for DefaultScenarioValues {}

/// HTTP specific context values for the [surge_runner::prelude::VuContext].
#[derive(Default, Debug)]
pub struct HttpVuContext<SV: UserValuesConstraint = DefaultScenarioValues> {
    pub(crate) client: Option<HttpClient>,
    pub scenario_values: SV,
}

impl<SV: UserValuesConstraint> UserValuesConstraint for HttpVuContext<SV> {}

impl<SV: UserValuesConstraint> HttpVuContext<SV> {
    /// Get the [HttpClient] that was created during VU setup.
    pub fn client(&self) -> anyhow::Result<HttpClient> {
        self.client.clone().context(
            "client is not set, did you forget to call `connect_http_client` in your vu_setup?",
        )
    }
}
