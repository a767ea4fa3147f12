//! Variant registration and test discovery.
//!
//! Variants register themselves explicitly, in the order the host lists them; discovery then expands each variant
//! into one unit per declared method whose name carries the test prefix. Nothing is cached: every call to
//! [`Registry::discover`] recomputes the units.

use std::any::TypeId;
use std::fmt;

use casework_core::CaseContext;

use crate::case::{TestCase, TestMethod};

/// A registered variant, with its concrete type erased.
struct Variant {
    type_id: TypeId,
    name: &'static str,
    discover: fn() -> Vec<DiscoveredUnit>,
}

/// Ordered set of test variants.
#[derive(Default)]
pub struct Registry {
    variants: Vec<Variant>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`. Registering a type twice keeps its first position.
    pub fn register<T: TestCase>(&mut self) -> &mut Self {
        let type_id = TypeId::of::<T>();
        if self.variants.iter().any(|v| v.type_id == type_id) {
            tracing::debug!(variant = T::variant_name(), "variant already registered");
            return self;
        }
        self.variants.push(Variant {
            type_id,
            name: T::variant_name(),
            discover: discover_variant::<T>,
        });
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<T: TestCase>(mut self) -> Self {
        self.register::<T>();
        self
    }

    pub fn variant_names(&self) -> Vec<&'static str> {
        self.variants.iter().map(|v| v.name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Expand every variant into its test units, in registration then declaration order.
    pub fn discover(&self) -> Vec<DiscoveredUnit> {
        self.variants.iter().flat_map(|v| (v.discover)()).collect()
    }
}

fn discover_variant<T: TestCase>() -> Vec<DiscoveredUnit> {
    T::declared_methods()
        .into_iter()
        .filter(TestMethod::is_test)
        .map(DiscoveredUnit::new::<T>)
        .collect()
}

/// One (variant, method) pairing, able to instantiate a fresh variant for its single run.
pub struct DiscoveredUnit {
    variant: &'static str,
    method: &'static str,
    instantiate: Box<dyn Fn(CaseContext) -> Box<dyn LiveUnit>>,
}

impl DiscoveredUnit {
    fn new<T: TestCase>(method: TestMethod<T>) -> Self {
        Self {
            variant: T::variant_name(),
            method: method.name(),
            instantiate: Box::new(move |context| -> Box<dyn LiveUnit> {
                Box::new(Live {
                    case: T::with_context(context),
                    method,
                })
            }),
        }
    }

    pub fn variant(&self) -> &'static str {
        self.variant
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Build a fresh variant instance owning `context`.
    pub fn instantiate(&self, context: CaseContext) -> Box<dyn LiveUnit> {
        (self.instantiate)(context)
    }
}

impl fmt::Display for DiscoveredUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.variant, self.method)
    }
}

impl fmt::Debug for DiscoveredUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveredUnit")
            .field("variant", &self.variant)
            .field("method", &self.method)
            .finish()
    }
}

/// A variant instance bound to the one method it was created to run.
pub trait LiveUnit {
    fn set_up(&mut self);
    fn invoke(&mut self);
    fn tear_down(&mut self);
    fn context(&mut self) -> &mut CaseContext;
}

struct Live<T> {
    case: T,
    method: TestMethod<T>,
}

impl<T: TestCase> LiveUnit for Live<T> {
    fn set_up(&mut self) {
        self.case.set_up();
    }

    fn invoke(&mut self) {
        self.method.invoke(&mut self.case);
    }

    fn tear_down(&mut self) {
        self.case.tear_down();
    }

    fn context(&mut self) -> &mut CaseContext {
        self.case.context()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::CaseState;
    use casework_core::{CollectingReporter, MainQueue};
    use std::rc::Rc;

    struct Alpha {
        cx: CaseContext,
    }

    impl CaseState for Alpha {
        fn variant_name() -> &'static str {
            "Alpha"
        }

        fn with_context(context: CaseContext) -> Self {
            Self { cx: context }
        }

        fn context(&mut self) -> &mut CaseContext {
            &mut self.cx
        }
    }

    impl TestCase for Alpha {
        fn declared_methods() -> Vec<TestMethod<Self>> {
            vec![
                TestMethod::new("testFoo", |_| {}),
                TestMethod::new("helperTest", |_| {}),
                TestMethod::new("test_bar", |_| {}),
            ]
        }
    }

    struct Empty {
        cx: CaseContext,
    }

    impl CaseState for Empty {
        fn variant_name() -> &'static str {
            "Empty"
        }

        fn with_context(context: CaseContext) -> Self {
            Self { cx: context }
        }

        fn context(&mut self) -> &mut CaseContext {
            &mut self.cx
        }
    }

    impl TestCase for Empty {
        fn declared_methods() -> Vec<TestMethod<Self>> {
            vec![TestMethod::new("helper", |_| {})]
        }
    }

    fn names(units: &[DiscoveredUnit]) -> Vec<String> {
        units.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn discovery_filters_by_prefix_in_declaration_order() {
        let registry = Registry::new().with::<Alpha>();
        assert_eq!(names(&registry.discover()), vec!["Alpha.testFoo", "Alpha.test_bar"]);
    }

    #[test]
    fn registration_order_is_discovery_order() {
        let registry = Registry::new().with::<Empty>().with::<Alpha>();
        assert_eq!(registry.variant_names(), vec!["Empty", "Alpha"]);
        assert_eq!(names(&registry.discover()), vec!["Alpha.testFoo", "Alpha.test_bar"]);
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let mut registry = Registry::new();
        registry.register::<Alpha>().register::<Empty>().register::<Alpha>();
        assert_eq!(registry.variant_names(), vec!["Alpha", "Empty"]);
        assert_eq!(registry.discover().len(), 2);
    }

    #[test]
    fn empty_registry_discovers_nothing() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.discover().is_empty());
    }

    #[test]
    fn instantiated_unit_owns_the_given_context() {
        let registry = Registry::new().with::<Alpha>();
        let units = registry.discover();
        let reporter = Rc::new(CollectingReporter::new());
        let mut live = units[0].instantiate(CaseContext::new(reporter.clone(), Rc::new(MainQueue::new())));
        live.context().fail("through the unit");
        assert_eq!(reporter.messages(), vec!["failed: through the unit"]);
    }
}
