//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Builds a scope-aware, rewritable IR of Fortran programs from the parse
//! trees of external front-end parsers.

pub mod config;
pub mod error;
pub mod expression;
pub mod frontend;
pub mod ir;
pub mod module;
pub mod rebuilder;
pub mod scope;
pub mod source;
pub mod sourcefile;
pub mod subroutine;
pub mod types;
pub mod visitor;
