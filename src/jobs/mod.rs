pub mod poller;

pub use poller::FeaturePoller;
