pub mod feed;
pub mod panels;
pub mod poller;
pub mod session;
pub mod store;
pub mod view;
