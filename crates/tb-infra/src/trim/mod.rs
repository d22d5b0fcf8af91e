mod basic_engine;

pub use basic_engine::BasicTrimEngine;
