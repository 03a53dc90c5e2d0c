#![allow(dead_code)]

pub mod fake_document;
pub mod storage;
