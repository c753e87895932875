//! hangul-cloud - Korean word-cloud generator
//!
//! Extracts nouns from Korean text with morphological analysis and renders
//! them as a word cloud, optionally shaped by a mask image.

pub mod analyzer;
pub mod cloud;
pub mod config;
pub mod error;
pub mod font;
pub mod intake;
pub mod pipeline;
pub mod presenter;
pub mod server;
pub mod stopwords;
