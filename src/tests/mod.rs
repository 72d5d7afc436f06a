pub mod queue_tests;
pub mod service_tests;
