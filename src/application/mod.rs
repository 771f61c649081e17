// Application layer - Use cases and collaborator interfaces
pub mod dashboard_host;
pub mod dashboard_service;
pub mod resource_fetcher;
