pub mod crawler;
pub mod http;
pub mod page_type;
pub mod web;
pub mod webdriver;

pub use crawler::{FetchOptions, FetchedPage, PageFetcher};
pub use http::HttpFetcher;
pub use web::{Crawler, crawl};
pub use webdriver::{WebDriverFetcher, connect_fetcher};
