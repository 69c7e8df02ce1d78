pub mod catalog;
pub mod config;
pub mod device;
pub mod fetcher;
pub mod http;
pub mod installer;

pub use catalog::CatalogClient;
pub use config::ConfigStore;
pub use device::DeviceEnumerator;
pub use fetcher::ContentFetcher;
pub use http::HttpClient;
pub use installer::Installer;
