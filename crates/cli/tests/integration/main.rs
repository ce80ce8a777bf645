mod build_tests;
mod common;
mod exe_tests;
mod registry_tests;
