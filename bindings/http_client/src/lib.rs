mod client;
mod parsed_body;

pub mod prelude {
    pub use crate::client::{
        HttpClientConfig, HttpClientInstrumented as HttpClient, HttpResponse, DEFAULT_TIMEOUT,
    };
    pub use crate::parsed_body::ParsedBody;

    // The URL type used by the client, re-exported so that scenarios do not need to depend on
    // the `url` crate directly
    pub use url::Url;
}
