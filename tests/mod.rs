mod queue_tests;
mod retry_tests;
mod support;
