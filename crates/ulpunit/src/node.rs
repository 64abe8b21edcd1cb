//! Test node hierarchy.
//!
//! A [`TestNode`] is either a leaf wrapping user logic ([`UnitTest`]) or a
//! [`Collection`] of further nodes. Containers ([`Container`]) own the nodes
//! registered with them and drop them when they are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::assertion::{Assertion, Info};
use crate::context::Context;
use crate::error::TestResult;

static NEXT_DEFAULT_NAME: AtomicU64 = AtomicU64::new(0);

/// Name handed to a leaf registered without one (`unit_test_<n>`).
#[must_use]
pub fn default_test_name() -> String {
    let n = NEXT_DEFAULT_NAME.fetch_add(1, Ordering::Relaxed);
    format!("unit_test_{n}")
}

/// User test logic.
///
/// `setup` and `teardown` run around every `run`, even when `run` fails.
pub trait UnitTest {
    fn run(&mut self, ctx: &mut Context<'_>) -> TestResult;

    fn setup(&mut self) {}

    fn teardown(&mut self) {}

    /// Name used when the test is registered without one.
    fn name(&self) -> Option<String> {
        None
    }
}

/// A named, registered test.
pub struct Leaf {
    name: String,
    test: Box<dyn UnitTest>,
}

impl Leaf {
    pub fn new(test: impl UnitTest + 'static) -> Self {
        let name = test.name().unwrap_or_else(default_test_name);
        Self::named(name, test)
    }

    pub fn named(name: impl Into<String>, test: impl UnitTest + 'static) -> Self {
        Self {
            name: name.into(),
            test: Box::new(test),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered group of nodes.
#[derive(Default)]
pub struct Collection {
    name: Option<String>,
    children: Vec<TestNode>,
}

impl Collection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection reported under `name` instead of its members' names.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Explicit name, or every descendant leaf name joined with `", "`.
    #[must_use]
    pub fn name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let mut names = Vec::new();
        self.collect_leaf_names(&mut names);
        names.join(", ")
    }

    fn collect_leaf_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        for child in &self.children {
            match child {
                TestNode::Leaf(leaf) => out.push(leaf.name()),
                TestNode::Collection(inner) => inner.collect_leaf_names(out),
            }
        }
    }
}

pub enum TestNode {
    Leaf(Leaf),
    Collection(Collection),
}

impl TestNode {
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Leaf(leaf) => leaf.name.clone(),
            Self::Collection(collection) => collection.name(),
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    pub fn setup(&mut self) {
        if let Self::Leaf(leaf) = self {
            leaf.test.setup();
        }
    }

    pub fn teardown(&mut self) {
        if let Self::Leaf(leaf) = self {
            leaf.test.teardown();
        }
    }

    /// Run a leaf's logic, or hand every child of a collection to `ctx`.
    pub fn run(&mut self, ctx: &mut Context<'_>) -> TestResult {
        match self {
            Self::Leaf(leaf) => leaf.test.run(ctx),
            Self::Collection(collection) => {
                for child in &mut collection.children {
                    ctx.run_node(child);
                }
                Ok(())
            }
        }
    }
}

/// What a closure test may return.
pub trait FnOutcome {
    fn into_test_result(self, ctx: &mut Context<'_>) -> TestResult;
}

/// The closure cannot return a failure, but an assertion it executed and
/// discarded still fails the test.
impl FnOutcome for () {
    fn into_test_result(self, _ctx: &mut Context<'_>) -> TestResult {
        Ok(())
    }
}

/// `false` is an assertion failure.
impl FnOutcome for bool {
    fn into_test_result(self, ctx: &mut Context<'_>) -> TestResult {
        ctx.execute(Assertion::truthy(self, Info::new("Function failed!")))?;
        Ok(())
    }
}

impl FnOutcome for TestResult {
    fn into_test_result(self, _ctx: &mut Context<'_>) -> TestResult {
        self
    }
}

/// Closure registered as a leaf.
pub struct FnTest<F> {
    body: F,
}

impl<F> FnTest<F> {
    pub fn new(body: F) -> Self {
        Self { body }
    }
}

impl<F, R> UnitTest for FnTest<F>
where
    F: FnMut(&mut Context<'_>) -> R,
    R: FnOutcome,
{
    fn run(&mut self, ctx: &mut Context<'_>) -> TestResult {
        (self.body)(ctx).into_test_result(ctx)
    }
}

/// Repeats a test's `run` and reports the time spent.
pub struct Performance<T> {
    name: String,
    repeats: usize,
    test: T,
}

impl<T: UnitTest> Performance<T> {
    pub fn new(name: impl Into<String>, repeats: usize, test: T) -> Self {
        Self {
            name: name.into(),
            repeats,
            test,
        }
    }
}

impl<T: UnitTest> UnitTest for Performance<T> {
    fn setup(&mut self) {
        self.test.setup();
    }

    fn teardown(&mut self) {
        self.test.teardown();
    }

    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    /// Stops at the first failing repetition; no timing line is written then.
    fn run(&mut self, ctx: &mut Context<'_>) -> TestResult {
        let started = Instant::now();
        for _ in 0..self.repeats {
            self.test.run(ctx)?;
        }
        let total = started.elapsed().as_secs_f64();
        let per_run = if self.repeats == 0 {
            0.0
        } else {
            total / self.repeats as f64
        };
        ctx.write(&format!(
            " TEST: [/name_color]{}[/default_color]\n did {} runs and used: {per_run:.3e}s per run (in {total:.6}s).\n",
            self.name, self.repeats
        ));
        Ok(())
    }
}

/// Owner of registered nodes.
pub trait Container {
    fn push_node(&mut self, node: TestNode);

    /// Register under the test's own name, or an automatic `unit_test_<n>`.
    fn add(&mut self, test: impl UnitTest + 'static) -> &mut Self {
        self.push_node(TestNode::Leaf(Leaf::new(test)));
        self
    }

    fn add_named(&mut self, name: impl Into<String>, test: impl UnitTest + 'static) -> &mut Self {
        self.push_node(TestNode::Leaf(Leaf::named(name, test)));
        self
    }

    /// Register a closure. A closure returning `bool` fails when it returns `false`.
    fn add_fn<F, R>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: FnMut(&mut Context<'_>) -> R + 'static,
        R: FnOutcome,
    {
        self.add_named(name, FnTest::new(body))
    }

    fn add_collection(&mut self, collection: Collection) -> &mut Self {
        self.push_node(TestNode::Collection(collection));
        self
    }

    fn add_performance<T>(&mut self, name: impl Into<String>, repeats: usize, test: T) -> &mut Self
    where
        T: UnitTest + 'static,
    {
        let name = name.into();
        self.add_named(name.clone(), Performance::new(name, repeats, test))
    }
}

impl Container for Collection {
    fn push_node(&mut self, node: TestNode) {
        self.children.push(node);
    }
}
