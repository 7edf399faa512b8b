#![forbid(unsafe_code)]

//! Core: viewport geometry, animation primitives, and the injectable random source.

pub mod animation;
pub mod geometry;
pub mod rng;
