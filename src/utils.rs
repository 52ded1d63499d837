use anyhow::{anyhow, Error, Result};
use ndarray::prelude::*;
use ndarray::IxDyn;
use ndarray_rand::{rand_distr::Normal, RandomExt};
use num::Float;

/// Tolerances for the finite-difference gradient check. Gradients agree when
/// the analytical value x and the perturbed value y satisfy
/// |x - y| <= atol + rtol * |y|.
#[derive(Debug, Clone, Copy)]
pub struct GradCheck {
    pub epsilon: f64,
    pub atol: f64,
    pub rtol: f64,
}

impl Default for GradCheck {
    fn default() -> Self {
        GradCheck {
            epsilon: 1e-6,
            atol: 1e-5,
            rtol: 1e-3,
        }
    }
}

/// computes the jacobian with central differences,
/// where f: R^n -> R^m, the jacobian is R^nxm
pub fn compute_jacobian(
    input: &ArrayD<f64>,
    f: impl Fn(&ArrayD<f64>) -> ArrayD<f64>,
    epsilon: f64,
) -> Result<Array2<f64>> {
    // dy/dx = lim h->0 (f(x + h) - f(x - h)) / (2h)
    let d_eps = 2.0 * epsilon;
    let mut input = input.as_standard_layout().into_owned();
    let n = input.len();
    let m = f(&input).len();

    let mut jac = Array2::<f64>::zeros((n, m));
    for i in 0..n {
        let old = input
            .as_slice()
            .map(|xs| xs[i])
            .ok_or_else(|| anyhow!("input is not contiguous"))?;
        set_flat(&mut input, i, old + epsilon)?;
        let diff1 = f(&input);
        set_flat(&mut input, i, old - epsilon)?;
        let diff2 = f(&input);

        jac.index_axis_mut(Axis(0), i)
            .iter_mut()
            .zip(diff1.iter())
            .zip(diff2.iter())
            .for_each(|((x, d1), d2)| {
                *x = (*d1 - *d2) / d_eps;
            });
        set_flat(&mut input, i, old)?;
    }

    Ok(jac)
}

fn set_flat(a: &mut ArrayD<f64>, i: usize, val: f64) -> Result<()> {
    let xs = a.as_slice_mut().ok_or_else(|| anyhow!("input is not contiguous"))?;
    xs[i] = val;
    Ok(())
}

/// Expects both f and df to be pure.
/// f: R^n -> R^m
/// df: R^m -> R^n, where the argument is the gradient w.r.t. the image of f
/// Each column of the numerical jacobian is compared against df applied to the
/// matching unit gradient.
pub fn grad_check(
    input: &ArrayD<f64>,
    f: impl Fn(&ArrayD<f64>) -> ArrayD<f64>,
    df: impl Fn(&ArrayD<f64>) -> ArrayD<f64>,
    tol: GradCheck,
) -> Result<()> {
    let test_out = f(input);
    let n = input.len();
    let m = test_out.len();
    let mut dy = ArrayD::<f64>::zeros(test_out.raw_dim());
    let test_grad = df(&dy);
    if test_grad.len() != n {
        return Err(Error::msg(format!(
            "f maps R{n} to R{m}, but df maps R{m} to R{}",
            test_grad.len()
        )));
    }
    let jacobian = compute_jacobian(input, f, tol.epsilon)?;

    for i in 0..m {
        set_flat(&mut dy, i, 1.0)?;
        let grad = df(&dy);
        let numerical = jacobian.index_axis(Axis(1), i);
        for (x, y) in grad.iter().zip(numerical.iter()) {
            if (x - y).abs() > tol.atol + tol.rtol * y.abs() {
                return Err(Error::msg(format!("jacobian mismatch on column {i} \n jacobian computed: \n {numerical} \n analytical computed: \n {grad}")));
            }
        }
        set_flat(&mut dy, i, 0.0)?;
    }

    Ok(())
}

pub fn randn64(shape: &[usize]) -> ArrayD<f64> {
    Array::random(IxDyn(shape), Normal::new(0.0, 1.0).unwrap())
}

pub fn randn32(shape: &[usize]) -> ArrayD<f32> {
    Array::random(IxDyn(shape), Normal::new(0.0, 1.0).unwrap())
}

/// Sum of the elementwise product, the inner product of two flattened tensors.
pub fn dot<A: Float>(a: &ArrayViewD<A>, b: &ArrayViewD<A>) -> A {
    a.iter().zip(b.iter()).fold(A::zero(), |acc, (x, y)| (*x).mul_add(*y, acc))
}

pub fn isclose<A: Float>(a: &ArrayViewD<A>, b: &ArrayViewD<A>) -> bool {
    let rtol = A::from(1e-5).unwrap();
    let atol = A::from(1e-8).unwrap();
    a.shape() == b.shape()
        && a.iter().zip(b.iter()).all(|(i, j)| (*i - *j).abs() <= atol + rtol * j.abs())
}
