//! Silicon model for the streaming 3x3 convolution layer.
//!
//! This crate has **no dependencies** and **no behaviour**. It is a pure
//! model of the block: control register offsets and bit-fields, kernel
//! geometry, and the arithmetic that sizes the window buffer and the output
//! grid.
//!
//! The register literals were taken from the bring-up bench of the layer
//! (`BCFG1=0x0002`, `BCFG2=0x0005`, `CPRM1=0x0041`); the field widths are
//! chosen to decode those words and are otherwise free.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Control register map, offsets and bit-field definitions |
//! | [`geometry`] | Kernel size, engine limit, window capacity, output grid |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geometry;
pub mod regs;
