pub mod docs_api_client;

pub use docs_api_client::DocsApiClient;
