#![allow(dead_code)]

pub mod recording_notifier;
pub mod scripted_executor;
pub mod scripted_stream;
