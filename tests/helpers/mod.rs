#![allow(dead_code)]

pub mod mockserver;
pub mod paths;
