use std::collections::HashMap;

use anyhow::{Context as _, Error, Result};
use log::debug;

use super::{Context, Element, Function};
use crate::shift::create_shift;

/// Builds a function from a context and its arguments written as RON.
pub type Creator<T> = fn(&Context, &str) -> Result<Box<dyn Function<T>>>;

/// Name -> constructor table for one element type.
pub struct FunctionRegistry<T> {
    creators: HashMap<String, Creator<T>>,
}

impl<T: Element> FunctionRegistry<T> {
    pub fn new() -> Self {
        FunctionRegistry { creators: HashMap::new() }
    }

    /// A registry holding every function this crate provides.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("Shift", create_shift::<T>);
        registry
    }

    /// Later registrations under the same name replace earlier ones.
    pub fn register(&mut self, name: &str, creator: Creator<T>) {
        debug!("registering function {} for {}", name, T::DTYPE);
        self.creators.insert(name.to_string(), creator);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.creators.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn create(&self, name: &str, ctx: &Context, args: &str) -> Result<Box<dyn Function<T>>> {
        let creator = self
            .creators
            .get(name)
            .ok_or_else(|| Error::msg(format!("no function named '{}' is registered, known: {:?}", name, self.names())))?;
        creator(ctx, args).with_context(|| format!("failed to create {} from {}", name, args))
    }
}

impl<T: Element> Default for FunctionRegistry<T> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShiftError;
    use crate::function::Variable;
    use ndarray::{array, ArrayD};

    #[test]
    fn test_create_shift() {
        let registry = FunctionRegistry::<f64>::with_defaults();
        assert_eq!(registry.names(), vec!["Shift"]);

        let ctx = Context::default();
        let mut f = registry
            .create("Shift", &ctx, r#"(shifts: [0, 1], border_mode: "nearest")"#)
            .unwrap();
        assert_eq!(f.name(), "Shift");
        assert_eq!(f.context(), &ctx);

        let x = Variable::from_array(array![[1.0, 2.0, 3.0, 4.0]].into_dyn());
        let mut y = Variable::new(&[1]);
        f.setup(&[&x], &mut [&mut y]).unwrap();
        f.forward(&[&x], &mut [&mut y]).unwrap();
        let expected: ArrayD<f64> = array![[1.0, 1.0, 2.0, 3.0]].into_dyn();
        assert_eq!(y.data, expected);
    }

    #[test]
    fn test_unknown_name() {
        let registry = FunctionRegistry::<f32>::with_defaults();
        let err = registry.create("Roll", &Context::default(), "()").err().unwrap();
        assert!(format!("{}", err).contains("'Roll'"));
    }

    #[test]
    fn test_bad_border_mode_is_configuration_error() {
        let registry = FunctionRegistry::<f32>::default();
        let err = registry
            .create("Shift", &Context::default(), r#"(shifts: [1], border_mode: "wrap")"#)
            .err()
            .unwrap();
        assert!(err.downcast_ref::<ShiftError>().unwrap().is_configuration());
    }
}
