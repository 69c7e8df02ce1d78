pub mod catalog_http;
pub mod command_installer;
pub mod config_store;
pub mod content_fetcher;
pub mod endpoint_guard;
pub mod inventory;
pub mod modalias;

pub use catalog_http::HttpCatalogClient;
pub use command_installer::CommandInstaller;
pub use config_store::TomlConfigStore;
pub use content_fetcher::HttpContentFetcher;
pub use endpoint_guard::EndpointGuard;
pub use inventory::InventoryFileEnumerator;
pub use modalias::ModaliasEnumerator;
