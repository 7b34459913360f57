mod dispatch_test;
mod failure_tracker_test;
mod retry_test;
