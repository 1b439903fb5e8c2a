use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use attl::TemplateClass;

use crate::compile_error::CodegenError;
use crate::directive::Directive;
use crate::parse::ParsedTemplate;

/// The type name the symbol table records for macro variables.
pub const TEMPLATE_TYPE: &str = "Template";

/// Everything the translator learned about the names of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    /// Declared parameters, in declaration order
    pub parameters: Vec<String>,
    /// Types of the declared parameters, parallel to `parameters`
    pub parameter_types: Vec<String>,
    /// Every variable defined in the template
    pub variables: BTreeSet<String>,
    /// The type of each known variable
    pub types: BTreeMap<String, String>,
    /// The type of each known return value
    pub return_types: BTreeMap<String, String>,
}

impl SymbolTable {
    /// Declare a variable, or fail if it was declared with another type.
    ///
    /// Returns the conflicting type on failure.
    pub fn declare(&mut self, name: &str, ty: &str) -> Result<(), String> {
        match self.types.get(name) {
            Some(found) if found != ty => Err(found.clone()),
            Some(_) => Ok(()),
            None => {
                let _ = self.variables.insert(name.to_owned());
                let _ = self.types.insert(name.to_owned(), ty.to_owned());
                Ok(())
            },
        }
    }

    /// Declare a parameter, it is a variable, too
    pub fn declare_parameter(&mut self, name: &str, ty: &str) -> Result<(), String> {
        self.declare(name, ty)?;
        if !self.parameters.iter().any(|p| p == name) {
            self.parameters.push(name.to_owned());
            self.parameter_types.push(ty.to_owned());
        }
        Ok(())
    }
}

/// Turns directives into code of the target language.
pub trait Translator {
    /// The code for a statement directive.
    ///
    /// The translator may record the names it encounters in `symbols`.
    fn statement_code(
        &self,
        directive: &Directive,
        symbols: &mut SymbolTable,
    ) -> Result<String, CodegenError>;

    /// The code closing the statement `name`. An empty string means the statement needs no end.
    fn end_code(&self, name: &str) -> String;

    /// The code binding the variable `name` to the macro of the same name.
    fn macro_binding_code(&self, name: &str) -> String;
}

/// Compiles a parsed template into a [`TemplateClass`].
///
/// The parser calls it for every macro it extracts.
pub trait Compiler {
    #[allow(missing_docs)]
    fn compile(&self, template: &ParsedTemplate) -> Result<Arc<TemplateClass>, CodegenError>;
}
