pub mod archive;
pub mod arithmetic;
pub mod bit_stream;
pub mod counts;
pub mod error;
pub mod frequency_model;
pub mod progress;
pub mod views;

#[doc(hidden)]
pub mod _internal_test_data;
