//! The operator contract a graph engine drives: variables carrying a data and
//! a gradient buffer, and functions with setup, forward and backward hooks.

use std::fmt::Debug;

use anyhow::Result;
use ndarray::{ArrayD, IxDyn};
use num::Float;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::ShiftError;

pub mod registry;

pub use registry::{Creator, FunctionRegistry};

/// Element type tags reported through `in_types` / `out_types`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DType {
    Float32,
    Float64,
}

/// Scalar types a function can be instantiated with.
pub trait Element: Float + Debug + Send + Sync + 'static {
    const DTYPE: DType;
}

impl Element for f32 {
    const DTYPE: DType = DType::Float32;
}

impl Element for f64 {
    const DTYPE: DType = DType::Float64;
}

/// Where a function runs and which array class backs its buffers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub backend: Vec<String>,
    pub array_class: String,
    pub device_id: String,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            backend: vec!["cpu:float".to_string()],
            array_class: Cpu::DEFAULT_ARRAY_CLASS.to_string(),
            device_id: "0".to_string(),
        }
    }
}

/// Device capability provider for host memory.
pub struct Cpu;

impl Cpu {
    pub const DEFAULT_ARRAY_CLASS: &'static str = "CpuCachedArray";

    pub fn array_classes() -> Vec<String> {
        vec!["CpuArray".to_string(), "CpuCachedArray".to_string()]
    }
}

/// A tensor slot in the graph: values and the gradient w.r.t. them, always
/// kept at the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable<T> {
    pub data: ArrayD<T>,
    pub grad: ArrayD<T>,
}

impl<T: Element> Variable<T> {
    pub fn new(shape: &[usize]) -> Self {
        Variable {
            data: ArrayD::zeros(IxDyn(shape)),
            grad: ArrayD::zeros(IxDyn(shape)),
        }
    }

    pub fn from_array(data: ArrayD<T>) -> Self {
        let grad = ArrayD::zeros(data.raw_dim());
        Variable { data, grad }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Resizes both buffers, zero filled, when `shape` differs from the current one.
    pub fn reshape(&mut self, shape: &[usize]) {
        if self.shape() != shape {
            self.data = ArrayD::zeros(IxDyn(shape));
            self.grad = ArrayD::zeros(IxDyn(shape));
        }
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(T::zero());
    }
}

fn check_count(name: &str, what: &str, got: usize, min: usize) -> Result<()> {
    if got < min {
        return Err(ShiftError::arity(name, format!("expected at least {min} {what}, got {got}")).into());
    }
    Ok(())
}

/// A differentiable operator.
///
/// Hosts call `setup` whenever input shapes change, then any number of
/// `forward` / `backward` calls against those shapes. The provided methods
/// check arity before handing over to the `*_impl` hooks.
pub trait Function<T: Element> {
    fn name(&self) -> &str;
    fn min_inputs(&self) -> usize;
    fn min_outputs(&self) -> usize;
    fn context(&self) -> &Context;

    /// A fresh instance with the same arguments; it must be set up again.
    fn copy(&self) -> Box<dyn Function<T>>;

    fn in_types(&self) -> Vec<DType> {
        vec![T::DTYPE]
    }

    fn out_types(&self) -> Vec<DType> {
        vec![T::DTYPE]
    }

    fn allowed_array_classes(&self) -> Vec<String> {
        Cpu::array_classes()
    }

    fn setup_impl(&mut self, inputs: &[&Variable<T>], outputs: &mut [&mut Variable<T>]) -> Result<()>;

    fn forward_impl(&mut self, inputs: &[&Variable<T>], outputs: &mut [&mut Variable<T>]) -> Result<()>;

    fn backward_impl(
        &mut self,
        inputs: &mut [&mut Variable<T>],
        outputs: &[&Variable<T>],
        propagate_down: &[bool],
        accum: &[bool],
    ) -> Result<()>;

    fn setup(&mut self, inputs: &[&Variable<T>], outputs: &mut [&mut Variable<T>]) -> Result<()> {
        check_count(self.name(), "inputs", inputs.len(), self.min_inputs())?;
        check_count(self.name(), "outputs", outputs.len(), self.min_outputs())?;
        self.setup_impl(inputs, outputs)
    }

    fn forward(&mut self, inputs: &[&Variable<T>], outputs: &mut [&mut Variable<T>]) -> Result<()> {
        check_count(self.name(), "inputs", inputs.len(), self.min_inputs())?;
        check_count(self.name(), "outputs", outputs.len(), self.min_outputs())?;
        self.forward_impl(inputs, outputs)
    }

    fn backward(
        &mut self,
        inputs: &mut [&mut Variable<T>],
        outputs: &[&Variable<T>],
        propagate_down: &[bool],
        accum: &[bool],
    ) -> Result<()> {
        check_count(self.name(), "inputs", inputs.len(), self.min_inputs())?;
        check_count(self.name(), "outputs", outputs.len(), self.min_outputs())?;
        check_count(self.name(), "propagate_down flags", propagate_down.len(), inputs.len())?;
        check_count(self.name(), "accum flags", accum.len(), inputs.len())?;
        for v in outputs.iter() {
            if v.grad.shape() != v.data.shape() {
                return Err(ShiftError::arity(
                    self.name(),
                    format!("output gradient shape {:?} differs from data shape {:?}", v.grad.shape(), v.data.shape()),
                )
                .into());
            }
        }
        self.backward_impl(inputs, outputs, propagate_down, accum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_reshape() {
        let mut v = Variable::<f32>::new(&[2, 3]);
        v.data.fill(1.0);
        v.reshape(&[2, 3]);
        assert_eq!(v.data[[1, 2]], 1.0);
        v.reshape(&[4]);
        assert_eq!(v.shape(), &[4]);
        assert_eq!(v.grad.shape(), &[4]);
        assert!(v.data.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_dtype_names() {
        assert_eq!(DType::Float32.to_string(), "float32");
        assert_eq!(<f64 as Element>::DTYPE, DType::Float64);
    }

    #[test]
    fn test_default_context() {
        let ctx = Context::default();
        assert!(Cpu::array_classes().contains(&ctx.array_class));
    }
}
