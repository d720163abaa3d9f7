//! pixelsync library
//!
//! Batched photo/video transfer between a desktop folder and an Android
//! device over adb, with storage backpressure on the device side.

pub mod adb;
pub mod cancel;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod logger;
pub mod progress;
pub mod pull;
pub mod purge;
pub mod push;
pub mod report;
pub mod session;
pub mod storage;
