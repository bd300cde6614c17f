// src/transform/mod.rs

//! Concrete stages and transforms used by the tasks.

pub mod concat;
pub mod css;
pub mod html;
pub mod images;
pub mod js;
pub mod ngdocs;
pub mod rename;
pub mod sprite;
pub mod templates;
