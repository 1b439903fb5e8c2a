use std::{fmt, io};

/// Errors while constructing a template instance.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A declared macro could not be instantiated. The template is unusable without it.
    #[error("could not construct macro {name:?}: {source}")]
    MacroConstruction {
        /// Name of the macro
        name: String,
        /// The original cause
        #[source]
        source: Box<RuntimeError>,
    },
    /// The configured `output.encoding` is not supported
    #[error("unsupported output encoding {0:?}")]
    UnsupportedEncoding(String),
    /// A custom template constructor failed
    #[error("{0}")]
    Construction(String),
}

/// Errors while rendering a template.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The template tried to write, but the active context frame has no output
    #[error("no output is bound to the current context")]
    NoOutput,
    /// The template body reported a failure
    #[error("could not render template {template:?}: {message}")]
    Template {
        /// Name of the failing template
        template: Option<String>,
        /// What went wrong
        message: String,
    },
    /// Writing into an [fmt::Write] target failed
    #[error("could not write output")]
    Fmt(#[from] fmt::Error),
    /// Writing into an [io::Write] target failed
    #[error("could not write output: {0}")]
    Io(#[from] io::Error),
}
