pub mod deliveries;
pub mod dispatch;
pub mod test_endpoint;
