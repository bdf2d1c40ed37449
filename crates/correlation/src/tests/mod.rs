mod analyzer_tests;
mod helpers;
mod report_tests;
mod service_tests;
