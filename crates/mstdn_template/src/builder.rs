//! Scoped builder for nested template sections.
//!
//! A [`SectionBuilder`] mutably borrows its parent while it is open and is
//! attached to the parent exactly once, when it goes out of scope. The
//! borrow checker therefore rejects writes to a parent while one of its
//! children is still open. Re-opening or overwriting a section that was
//! already closed in the same scope is a builder misuse and reported as
//! [`TemplateError::SectionClosed`].

use std::collections::BTreeSet;

use tracing::trace;

use crate::error::{TemplateError, TemplateResult};
use crate::template::Template;
use crate::value::{Mapping, Value};

struct ParentSlot<'p> {
    key: String,
    body: &'p mut Mapping,
    closed: &'p mut BTreeSet<String>,
}

/// Builder for one mapping-valued section of a template.
pub struct SectionBuilder<'p> {
    path: String,
    body: Mapping,
    closed: BTreeSet<String>,
    parent: Option<ParentSlot<'p>>,
}

impl SectionBuilder<'static> {
    fn root() -> Self {
        Self {
            path: String::new(),
            body: Mapping::new(),
            closed: BTreeSet::new(),
            parent: None,
        }
    }
}

impl<'p> SectionBuilder<'p> {
    /// Dotted path of this section from the document root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Attach a value under `key` in this section.
    ///
    /// # Panics
    ///
    /// Panics if `key` names a child section that was already closed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        if let Err(e) = self.try_set(key, value) {
            panic!("template builder misuse: {e}");
        }
        self
    }

    /// Fallible variant of [`set`](Self::set).
    pub fn try_set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> TemplateResult<&mut Self> {
        let key = key.into();
        if self.closed.contains(&key) {
            return Err(TemplateError::SectionClosed(self.child_path(&key)));
        }
        self.body.insert(key, value);
        Ok(self)
    }

    /// Open a child section. It is attached to this section when dropped.
    ///
    /// # Panics
    ///
    /// Panics if a section with the same name was already closed here.
    pub fn open_section(&mut self, name: impl Into<String>) -> SectionBuilder<'_> {
        match self.try_open_section(name) {
            Ok(child) => child,
            Err(e) => panic!("template builder misuse: {e}"),
        }
    }

    /// Fallible variant of [`open_section`](Self::open_section).
    pub fn try_open_section(&mut self, name: impl Into<String>) -> TemplateResult<SectionBuilder<'_>> {
        let name = name.into();
        let path = self.child_path(&name);
        if self.closed.contains(&name) {
            return Err(TemplateError::SectionClosed(path));
        }
        trace!("Opening section {}", path);
        Ok(SectionBuilder {
            path,
            body: Mapping::new(),
            closed: BTreeSet::new(),
            parent: Some(ParentSlot {
                key: name,
                body: &mut self.body,
                closed: &mut self.closed,
            }),
        })
    }

    /// Open a child section, fill it with `build`, and close it.
    pub fn section<F>(&mut self, name: impl Into<String>, build: F) -> &mut Self
    where
        F: FnOnce(&mut SectionBuilder<'_>),
    {
        {
            let mut child = self.open_section(name);
            build(&mut child);
        }
        self
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }
}

impl Drop for SectionBuilder<'_> {
    fn drop(&mut self) {
        if let Some(parent) = self.parent.take() {
            let body = std::mem::take(&mut self.body);
            parent.body.insert(parent.key.clone(), Value::Mapping(body));
            parent.closed.insert(parent.key);
        }
    }
}

/// Builder for a whole template document.
pub struct TemplateBuilder {
    root: SectionBuilder<'static>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self {
            root: SectionBuilder::root(),
        }
    }

    /// Attach a top-level value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.root.set(key, value);
        self
    }

    pub fn try_set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> TemplateResult<&mut Self> {
        self.root.try_set(key, value)?;
        Ok(self)
    }

    pub fn open_section(&mut self, name: impl Into<String>) -> SectionBuilder<'_> {
        self.root.open_section(name)
    }

    pub fn try_open_section(&mut self, name: impl Into<String>) -> TemplateResult<SectionBuilder<'_>> {
        self.root.try_open_section(name)
    }

    pub fn section<F>(&mut self, name: impl Into<String>, build: F) -> &mut Self
    where
        F: FnOnce(&mut SectionBuilder<'_>),
    {
        self.root.section(name, build);
        self
    }

    /// Finish building and return the document.
    pub fn finish(mut self) -> Template {
        Template::from_root(std::mem::take(&mut self.root.body))
    }
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
