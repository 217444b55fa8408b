use std::fmt::{Debug, Formatter};

use anyhow::Context;
use surge_runner::prelude::UserValuesConstraint;
use url::Url;

use crate::context::DefaultScenarioValues;

/// HTTP specific runner context values.
///
/// The base URL and token are filled in from the command line by
/// [crate::prelude::HttpScenarioDefinitionBuilder]. The scenario values are for the scenario's own
/// setup to fill in.
#[derive(Default)]
pub struct HttpRunnerContext<SV: UserValuesConstraint = DefaultScenarioValues> {
    pub(crate) base_url: Option<Url>,
    pub(crate) access_token: Option<String>,
    pub scenario_values: SV,
}

impl<SV: UserValuesConstraint> UserValuesConstraint for HttpRunnerContext<SV> {}

impl<SV: UserValuesConstraint> HttpRunnerContext<SV> {
    pub(crate) fn new(base_url: Url, access_token: Option<String>) -> Self {
        Self {
            base_url: Some(base_url),
            access_token,
            scenario_values: SV::default(),
        }
    }

    pub fn base_url(&self) -> anyhow::Result<&Url> {
        self.base_url
            .as_ref()
            .context("base_url is not set, was the scenario created with HttpScenarioDefinitionBuilder?")
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl<SV: UserValuesConstraint> Debug for HttpRunnerContext<SV> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRunnerContext")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("scenario_values", &self.scenario_values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_token() {
        let ctx = HttpRunnerContext::<DefaultScenarioValues>::new(
            Url::parse("http://localhost:8080").unwrap(),
            Some("secret".to_string()),
        );

        let debug = format!("{ctx:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn missing_base_url() {
        let ctx = HttpRunnerContext::<DefaultScenarioValues>::default();
        assert!(ctx.base_url().is_err());
    }
}
