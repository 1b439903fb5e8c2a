// Copyright (c) 2021-2022 René Kijewski <crates.io@k6i.de>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// --- LLVM Exceptions to the Apache 2.0 License ----
//
// As an exception, if, as a result of your compiling your source code, portions
// of this Software are embedded into an Object form of such source code, you
// may redistribute such embedded portions in such Object form without complying
// with the conditions of Sections 4(a), 4(b) and 4(d) of the License.
//
// In addition, if you combine or link compiled forms of this Software with
// software that is licensed under the GPLv2 ("Combined Software") and if a
// court of competent jurisdiction determines that the patent provision (Section
// 3), the indemnity provision (Section 9) or other Section of the License
// conflicts with the conditions of the GPLv2, you may retroactively and
// prospectively choose to deem waived or otherwise exclude such Section(s) of
// the License, but only in their entirety and only with respect to the Combined
// Software.

#![forbid(unsafe_code)]
#![warn(absolute_paths_not_starting_with_crate)]
#![warn(elided_lifetimes_in_paths)]
#![warn(explicit_outlives_requirements)]
#![warn(meta_variable_misuse)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(noop_method_call)]
#![warn(trivial_casts)]
#![warn(unreachable_pub)]
#![warn(unused_extern_crates)]
#![warn(unused_lifetimes)]
#![warn(unused_results)]

//! ## ATTL directive parser
//!
//! Rewrites the directives of an [ATTL](https://crates.io/crates/attl) template into code markers.
//!
//! Directives live in attributes or in comments:
//!
//! ```html
//! <div if="x &gt; 1">A</div>
//! <!--foreach="item : items"--><li>${item}</li><!--end="foreach"-->
//! <!--macro="greet(name)"-->Hello, ${name}!<!--end="macro"-->
//! ```
//!
//! The [`AttributeParser`] asks a [`Translator`] for the code of every directive and replaces the
//! directive with a [marker](markers) carrying that code and the length of the source text it
//! stands for. Statements in attributes are closed after their element ends, in reverse order.
//!
//! Macros are cut out of the document, parsed recursively, and handed to a [`Compiler`]. The
//! document keeps only a marker binding the macro to a variable of the same name.
//!
//! Element structure comes from a tolerant [markup] tokenizer built with
//! [nom](https://crates.io/crates/nom): malformed markup is treated as text, never as an error.

mod compile_error;
mod directive;
mod edit;
pub mod markers;
pub mod markup;
mod parse;
mod resource;
mod translate;

pub use crate::compile_error::{CodegenError, ErrorKind, ParseError};
pub use crate::directive::{is_named, Directive, DirectiveKind, DirectiveNames};
pub use crate::edit::EditList;
pub use crate::parse::{AttributeParser, Macro, ParsedTemplate};
pub use crate::resource::{macro_path, Resource};
pub use crate::translate::{Compiler, SymbolTable, Translator, TEMPLATE_TYPE};
