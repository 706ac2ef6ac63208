pub mod html;
pub mod rss_poller;

pub use rss_poller::RssFeedSource;
