//! The execution context: a parent-linked chain of frames describing what is rendering right now.
//!
//! Frames are passed explicitly into template bodies. For call sites that cannot thread a frame
//! through, the calling thread has an ambient slot, managed with [`Context::push()`],
//! [`Context::pop()`] and [`Context::remove()`], or scoped with [`Context::enter()`].

use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::Arc;

use crate::output::OutputHandle;
use crate::template::Template;
use crate::value::Value;

/// The name → value mapping a template is evaluated with.
pub type Parameters = HashMap<String, Value>;

thread_local! {
    static LOCAL: RefCell<Option<Rc<Context>>> = const { RefCell::new(None) };
}

/// An immutable execution frame.
pub struct Context {
    parent: Option<Rc<Context>>,
    template: Option<Arc<dyn Template>>,
    parameters: Option<Rc<Parameters>>,
    output: Option<OutputHandle>,
    context_parameters: OnceCell<ContextParameters>,
}

impl Context {
    fn new(
        parent: Option<Rc<Context>>,
        template: Option<Arc<dyn Template>>,
        parameters: Option<Rc<Parameters>>,
        output: Option<OutputHandle>,
    ) -> Self {
        Self {
            parent,
            template,
            parameters,
            output,
            context_parameters: OnceCell::new(),
        }
    }

    /// A frame without parent and with all fields unset
    pub fn root() -> Rc<Self> {
        Rc::new(Self::new(None, None, None, None))
    }

    /// A new frame whose parent is `self`. The ambient slot is not touched.
    pub fn child(
        self: &Rc<Self>,
        template: Option<Arc<dyn Template>>,
        parameters: Option<Rc<Parameters>>,
        output: Option<OutputHandle>,
    ) -> Rc<Self> {
        Rc::new(Self::new(Some(Rc::clone(self)), template, parameters, output))
    }

    /// The enclosing frame
    pub fn parent(&self) -> Option<&Rc<Context>> {
        self.parent.as_ref()
    }

    /// The template rendering in this frame
    pub fn template(&self) -> Option<&Arc<dyn Template>> {
        self.template.as_ref()
    }

    /// The active output
    pub fn output(&self) -> Option<&OutputHandle> {
        self.output.as_ref()
    }

    /// The parameters this frame was created with, without local additions
    pub fn raw_parameters(&self) -> Option<&Rc<Parameters>> {
        self.parameters.as_ref()
    }

    /// The parameters of this frame, with read/write semantics for frame-local additions.
    ///
    /// The view is created on first access. Writes to it are never visible in the original
    /// mapping or in any other frame.
    pub fn parameters(&self) -> &ContextParameters {
        self.context_parameters
            .get_or_init(|| ContextParameters::new(self.parameters.clone()))
    }

    /// The ambient frame of the calling thread, an empty root frame is created on first access.
    pub fn current() -> Rc<Self> {
        LOCAL.with(|local| {
            let mut local = local.borrow_mut();
            match &*local {
                Some(context) => Rc::clone(context),
                None => {
                    let context = Self::root();
                    *local = Some(Rc::clone(&context));
                    context
                },
            }
        })
    }

    /// The ambient frame of the calling thread, if any. Never creates a frame.
    pub fn ambient() -> Option<Rc<Self>> {
        LOCAL.with(|local| local.borrow().clone())
    }

    /// Install a new ambient frame whose parent is the current ambient frame.
    ///
    /// Every push must be matched by exactly one [`pop()`](Self::pop), also if the rendering
    /// fails. Prefer [`enter()`](Self::enter) which guarantees that.
    pub fn push(
        template: Option<Arc<dyn Template>>,
        parameters: Option<Rc<Parameters>>,
        output: Option<OutputHandle>,
    ) -> Rc<Self> {
        LOCAL.with(|local| {
            let mut local = local.borrow_mut();
            let context = Rc::new(Self::new(local.take(), template, parameters, output));
            tracing::trace!(context = ?context, "push context");
            *local = Some(Rc::clone(&context));
            context
        })
    }

    /// Restore the parent of the ambient frame, or clear the slot if there is no parent.
    ///
    /// Popping without an ambient frame is tolerated.
    pub fn pop() {
        LOCAL.with(|local| {
            let mut local = local.borrow_mut();
            match local.take() {
                Some(context) => {
                    tracing::trace!(context = ?context, "pop context");
                    *local = context.parent.clone();
                },
                None => tracing::warn!("pop without an ambient context"),
            }
        })
    }

    /// Clear the ambient slot, regardless of the push/pop balance.
    pub fn remove() {
        LOCAL.with(|local| drop(local.borrow_mut().take()));
    }

    /// [Push](Self::push) a frame that gets [popped](Self::pop) when the guard is dropped.
    pub fn enter(
        template: Option<Arc<dyn Template>>,
        parameters: Option<Rc<Parameters>>,
        output: Option<OutputHandle>,
    ) -> ContextGuard {
        ContextGuard(Self::push(template, parameters, output))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0;
        let mut parent = self.parent();
        while let Some(p) = parent {
            depth += 1;
            parent = p.parent();
        }
        f.debug_struct("Context")
            .field("depth", &depth)
            .field("template", &self.template.as_ref().and_then(|t| t.name()))
            .field(
                "parameters",
                &self.parameters.as_ref().map(|p| p.keys().collect::<BTreeSet<_>>()),
            )
            .field("output", &self.output.is_some())
            .finish()
    }
}

/// Pops the ambient frame on drop, see [`Context::enter()`].
#[must_use = "the context is popped when the guard is dropped"]
#[derive(Debug)]
pub struct ContextGuard(Rc<Context>);

impl ContextGuard {
    /// The frame that was pushed
    pub fn context(&self) -> &Rc<Context> {
        &self.0
    }
}

impl Deref for ContextGuard {
    type Target = Context;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        Context::pop();
    }
}

/// A layered view of a frame's parameters: reads fall through to the original mapping,
/// writes stay local to the view.
#[derive(Debug)]
pub struct ContextParameters {
    parameters: Option<Rc<Parameters>>,
    locals: RefCell<Parameters>,
}

impl ContextParameters {
    fn new(parameters: Option<Rc<Parameters>>) -> Self {
        Self {
            parameters,
            locals: RefCell::new(Parameters::new()),
        }
    }

    /// Look up a value, local additions take precedence
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.locals.borrow().get(key) {
            return Some(value.clone());
        }
        self.parameters.as_ref()?.get(key).cloned()
    }

    /// True if the key is set locally or in the original mapping
    pub fn contains_key(&self, key: &str) -> bool {
        self.locals.borrow().contains_key(key)
            || self.parameters.as_ref().map_or(false, |p| p.contains_key(key))
    }

    /// Set a local value, returning the previous local value
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.locals.borrow_mut().insert(key.into(), value.into())
    }

    /// Remove a local value. The original mapping is never modified.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.locals.borrow_mut().remove(key)
    }

    /// All visible keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let locals = self.locals.borrow();
        let mut keys = locals.keys().cloned().collect::<BTreeSet<_>>();
        if let Some(parameters) = &self.parameters {
            keys.extend(parameters.keys().cloned());
        }
        keys.into_iter().collect()
    }

    /// The merged mapping as it is visible right now
    pub fn snapshot(&self) -> Rc<Parameters> {
        let locals = self.locals.borrow();
        match &self.parameters {
            Some(parameters) if locals.is_empty() => Rc::clone(parameters),
            parameters => {
                let mut merged = parameters.as_deref().cloned().unwrap_or_default();
                merged.extend(locals.iter().map(|(k, v)| (k.clone(), v.clone())));
                Rc::new(merged)
            },
        }
    }
}
