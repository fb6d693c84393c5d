#![allow(dead_code)]

pub mod book;
pub mod engine;
pub mod universe;
