pub mod admin;
pub mod dispatch;
pub mod failure_tracker;
pub mod retry;
