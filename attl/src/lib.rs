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
#![warn(non_ascii_idents)]
#![warn(noop_method_call)]
#![warn(trivial_casts)]
#![warn(unreachable_pub)]
#![warn(unused_extern_crates)]
#![warn(unused_lifetimes)]
#![warn(unused_results)]

//! ## ATTL runtime
//!
//! Templates written in ATTL carry their control flow in attributes and comments:
//!
//! ```html
//! <ul>
//!   <li foreach="item : items">${item}</li>
//! </ul>
//! <!--macro="greet(name)"-->Hello, ${name}!<!--end="macro"-->
//! ```
//!
//! The compile stage ([attl-parser](https://crates.io/crates/attl-parser)) rewrites such a
//! source into code, and the generated code runs on top of this crate:
//!
//! *   [`TemplateBase`] holds everything a compiled template needs at runtime: the formatting
//!     dispatch over [`Value`], the output [filter](Filter), the `null`/`true`/`false` literals
//!     and output encoding from the [`Engine`] configuration, and its [macros](MacroTable).
//! *   [`TemplateClass`] is the compiled unit, [`CompiledTemplate`] an instance of it.
//! *   [`Context`] is the chain of frames describing the template that is rendering, its
//!     parameters and its output. Frames are passed explicitly, but every thread also has an
//!     ambient frame for call sites that cannot thread one through.
//!
//! Numbers are printed with [itoa](https://crates.io/crates/itoa) and
//! [ryu](https://crates.io/crates/ryu) unless the default feature `faster` is disabled.

mod charset;
pub mod context;
mod engine;
mod error;
mod format;
mod output;
mod template;
mod value;

pub use crate::charset::OutputCharset;
pub use crate::context::{Context, ContextGuard, ContextParameters, Parameters};
pub use crate::engine::{Engine, Properties, FALSE_VALUE, NULL_VALUE, OUTPUT_ENCODING, TRUE_VALUE};
pub use crate::error::{RenderError, RuntimeError};
pub use crate::format::{Filter, Formatter, MultiFormatter};
pub use crate::output::{Output, OutputHandle};
pub use crate::template::{
    CompiledTemplate, Constructor, Functions, MacroTable, RenderFn, Template, TemplateArgs,
    TemplateBase, TemplateClass,
};
pub use crate::value::{Number, Object, Value, ValueKind};
