// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod headless_host;
pub mod http_fetcher;
