use anyhow::{bail, Context};
use http_client_instrumented::prelude::{HttpClient, HttpClientConfig, DEFAULT_TIMEOUT};
use surge_runner::prelude::{HookResult, UserValuesConstraint, VuContext};
use url::Url;

use crate::context::HttpVuContext;
use crate::runner_context::HttpRunnerContext;

/// Parse and check a base URL from the command line or environment.
pub fn parse_base_url(base_url: &str) -> anyhow::Result<Url> {
    let url = Url::parse(base_url.trim())
        .with_context(|| format!("Invalid base URL: {base_url}"))?;

    if !matches!(url.scheme(), "http" | "https") {
        bail!("Base URL must use http or https, got: {base_url}");
    }
    if url.cannot_be_a_base() {
        bail!("Base URL cannot have paths added to it: {base_url}");
    }

    Ok(url)
}

/// Add path segments to a base URL.
///
/// Any path on the base is kept and trailing slashes on it are ignored, so
/// `http://host/api/` and `http://host/api` both give `http://host/api/{segments}`. Each segment
/// is percent-encoded as needed.
pub fn endpoint_url(base_url: &Url, segments: &[&str]) -> anyhow::Result<Url> {
    let mut url = base_url.clone();
    let base_path = base_url.path().trim_end_matches('/').to_string();
    url.set_path(&base_path);

    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("Base URL cannot have paths added to it: {base_url}"))?
        .extend(segments);

    Ok(url)
}

/// Client settings for VUs of an HTTP scenario. Every request gets [DEFAULT_TIMEOUT] and the
/// access token from the runner context, if there is one.
pub fn http_client_config<RSV: UserValuesConstraint>(
    runner_context: &HttpRunnerContext<RSV>,
) -> HttpClientConfig {
    HttpClientConfig {
        timeout: DEFAULT_TIMEOUT,
        access_token: runner_context.access_token().map(String::from),
    }
}

/// Create the instrumented HTTP client for this VU, using the access token from the runner context.
///
/// Call this function as follows:
/// ```rust
/// use http_surge_runner::prelude::{connect_http_client, HookResult, HttpRunnerContext, HttpVuContext, VuContext};
///
/// fn vu_setup(ctx: &mut VuContext<HttpRunnerContext, HttpVuContext>) -> HookResult {
///     connect_http_client(ctx)?;
///     Ok(())
/// }
/// ```
pub fn connect_http_client<RSV: UserValuesConstraint, VSV: UserValuesConstraint>(
    ctx: &mut VuContext<HttpRunnerContext<RSV>, HttpVuContext<VSV>>,
) -> HookResult {
    let reporter = ctx.runner_context().reporter();
    let config = http_client_config(ctx.runner_context().get());

    let client = HttpClient::new(reporter, config)
        .with_context(|| format!("Could not create HTTP client for {}", ctx.vu_id()))?;
    ctx.get_mut().client = Some(client);

    Ok(())
}
