//! The test-variant capability.
//!
//! A variant is a type that implements [`TestCase`] itself. There is no inheritance: composing or dereferencing to
//! another variant never makes its methods part of this one. Both traits are normally generated by
//! `#[derive(CaseState)]` and `#[suite]`, but can be written by hand.

use std::fmt;

use casework_core::CaseContext;

/// Prefix a declared method name must start with to be discovered as a test.
pub const TEST_PREFIX: &str = "test";

/// Construction of a variant around its per-unit [`CaseContext`].
pub trait CaseState: Sized {
    /// Name used in progress narration, e.g. `Executing <variant>.<method>`.
    fn variant_name() -> &'static str;

    /// Build a fresh instance owning `context`.
    fn with_context(context: CaseContext) -> Self;

    fn context(&mut self) -> &mut CaseContext;
}

/// The capability marker for test variants: lifecycle hooks plus the variant's own declared methods.
pub trait TestCase: CaseState + 'static {
    /// Runs before every test method, on a fresh instance.
    fn set_up(&mut self) {}

    /// Runs after every test method, even when the method reported failures or panicked.
    fn tear_down(&mut self) {}

    /// Every `fn(&mut self)` method declared by this type, in declaration order. Discovery filters these by
    /// [`TEST_PREFIX`].
    fn declared_methods() -> Vec<TestMethod<Self>>;
}

/// A named zero-argument method of a variant.
pub struct TestMethod<T> {
    name: &'static str,
    call: fn(&mut T),
}

impl<T> TestMethod<T> {
    pub fn new(name: &'static str, call: fn(&mut T)) -> Self {
        Self { name, call }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn invoke(&self, case: &mut T) {
        (self.call)(case);
    }

    pub fn is_test(&self) -> bool {
        is_test_method_name(self.name)
    }
}

// Manual impls: `T` itself need not be `Clone`/`Debug`.
impl<T> Clone for TestMethod<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TestMethod<T> {}

impl<T> fmt::Debug for TestMethod<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TestMethod").field(&self.name).finish()
    }
}

/// Whether `name` follows the test naming convention (a literal `test` prefix).
pub fn is_test_method_name(name: &str) -> bool {
    name.starts_with(TEST_PREFIX)
}
