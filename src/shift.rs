//! The Shift operator: forward gather and backward scatter-add over cached
//! address tables.
//!
//! For image data, shifting right by 2 pixels and up by 3 is `shifts = [-3, 2]`
//! on an `(h, w)` array.

use std::marker::PhantomData;

use anyhow::{anyhow, Result};
use log::{debug, trace};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};
use num::Float;
use serde::{Deserialize, Serialize};

use crate::addr_table::AddrTable;
use crate::border::BorderMode;
use crate::error::ShiftError;
use crate::function::{Context, Element, Function, Variable};
use crate::Config;

/// Construction arguments, as handed over by a registry or a config file.
/// The border mode stays a string here so an unknown value is reported as a
/// configuration error when the operator is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftArgs {
    pub shifts: Vec<i64>,
    pub border_mode: String,
}

impl Default for ShiftArgs {
    fn default() -> Self {
        ShiftArgs {
            shifts: Vec::new(),
            border_mode: BorderMode::Nearest.to_string(),
        }
    }
}

pub struct Shift<T> {
    ctx: Context,
    shifts: Vec<i64>,
    border_mode: BorderMode,
    addr_table: Option<AddrTable>,
    _elem: PhantomData<T>,
}

impl<T: Float> Shift<T> {
    pub fn new(shifts: Vec<i64>, border_mode: &str) -> Result<Self> {
        let border_mode = BorderMode::parse(border_mode)?;
        Ok(Self::with_mode(shifts, border_mode))
    }

    pub fn with_mode(shifts: Vec<i64>, border_mode: BorderMode) -> Self {
        Shift {
            ctx: Context::default(),
            shifts,
            border_mode,
            addr_table: None,
            _elem: PhantomData,
        }
    }

    pub fn from_args(ctx: &Context, args: &ShiftArgs) -> Result<Self> {
        Ok(Self::new(args.shifts.clone(), &args.border_mode)?.with_context(ctx.clone()))
    }

    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn args(&self) -> ShiftArgs {
        ShiftArgs {
            shifts: self.shifts.clone(),
            border_mode: self.border_mode.to_string(),
        }
    }

    pub fn shifts(&self) -> &[i64] {
        &self.shifts
    }

    pub fn border_mode(&self) -> BorderMode {
        self.border_mode
    }

    pub fn addr_table(&self) -> Option<&AddrTable> {
        self.addr_table.as_ref()
    }

    /// Validates the shift vector against `input_shape` and caches the tables.
    /// Rebuilding for the shape already cached is a no-op, and a failed rebuild
    /// keeps the previous tables.
    pub fn prepare_addr_table(&mut self, input_shape: &[usize]) -> Result<&AddrTable> {
        if !matches!(&self.addr_table, Some(table) if table.shape() == input_shape) {
            let table = AddrTable::build(input_shape, &self.shifts, self.border_mode)?;
            self.addr_table = Some(table);
        }
        self.table_for(input_shape)
    }

    fn table_for(&self, shape: &[usize]) -> Result<&AddrTable> {
        match &self.addr_table {
            Some(table) if table.shape() == shape => Ok(table),
            _ => Err(ShiftError::not_setup(shape).into()),
        }
    }

    /// Writes the shifted `x` into `y`; both must have the prepared shape.
    pub fn forward_into(&self, x: &ArrayViewD<T>, y: &mut ArrayViewMutD<T>) -> Result<()> {
        let table = self.table_for(x.shape())?;
        same_shape("output", table, y.shape())?;
        trace!("shift forward over {:?}", table.shape());
        let x = x.as_standard_layout();
        let xs = x.as_slice().ok_or_else(|| anyhow!("input is not contiguous"))?;
        match y.as_slice_mut() {
            Some(ys) => gather(table, xs, ys),
            None => {
                let mut out = ArrayD::zeros(y.raw_dim());
                gather(table, xs, contiguous_mut(&mut out)?);
                y.assign(&out);
            }
        }
        Ok(())
    }

    pub fn forward(&self, x: &ArrayViewD<T>) -> Result<ArrayD<T>> {
        let mut y = ArrayD::zeros(x.raw_dim());
        self.forward_into(x, &mut y.view_mut())?;
        Ok(y)
    }

    /// Adds the gradient of `dy` w.r.t. the input into `dx`. Never overwrites:
    /// zero `dx` first when the previous contents should not be kept.
    pub fn backward_into(&self, dy: &ArrayViewD<T>, dx: &mut ArrayViewMutD<T>) -> Result<()> {
        let table = self.table_for(dx.shape())?;
        same_shape("output gradient", table, dy.shape())?;
        trace!("shift backward over {:?}", table.shape());
        let dy = dy.as_standard_layout();
        let dys = dy.as_slice().ok_or_else(|| anyhow!("output gradient is not contiguous"))?;
        match dx.as_slice_mut() {
            Some(dxs) => scatter_add(table, dys, dxs),
            None => {
                let mut g = ArrayD::zeros(dx.raw_dim());
                scatter_add(table, dys, contiguous_mut(&mut g)?);
                Zip::from(dx).and(&g).for_each(|d, g| *d = *d + *g);
            }
        }
        Ok(())
    }

    pub fn backward(&self, dy: &ArrayViewD<T>) -> Result<ArrayD<T>> {
        let mut dx = ArrayD::zeros(dy.raw_dim());
        self.backward_into(dy, &mut dx.view_mut())?;
        Ok(dx)
    }
}

fn same_shape(what: &str, table: &AddrTable, shape: &[usize]) -> Result<()> {
    if table.shape() != shape {
        return Err(ShiftError::Precondition(format!(
            "{what} shape {shape:?} does not match the prepared shape {:?}",
            table.shape()
        ))
        .into());
    }
    Ok(())
}

fn contiguous_mut<T>(a: &mut ArrayD<T>) -> Result<&mut [T]> {
    a.as_slice_mut().ok_or_else(|| anyhow!("buffer is not contiguous"))
}

/// `y[o] = x[table(o)]` over row-major buffers of the table's shape.
fn gather<T: Copy>(table: &AddrTable, x: &[T], y: &mut [T]) {
    let inner = table.inner();
    let n = inner.len();
    if table.is_identity_axis(table.rank() - 1) {
        table.for_each_row(|xr, yr| y[yr..yr + n].copy_from_slice(&x[xr..xr + n]));
    } else {
        table.for_each_row(|xr, yr| {
            for (o, &src) in inner.iter().enumerate() {
                y[yr + o] = x[xr + src];
            }
        });
    }
}

/// `dx[table(o)] += dy[o]`; several `o` may land on the same input element.
fn scatter_add<T: Float>(table: &AddrTable, dy: &[T], dx: &mut [T]) {
    let inner = table.inner();
    let n = inner.len();
    if table.is_identity_axis(table.rank() - 1) {
        table.for_each_row(|xr, yr| {
            for (d, g) in dx[xr..xr + n].iter_mut().zip(&dy[yr..yr + n]) {
                *d = *d + *g;
            }
        });
    } else {
        table.for_each_row(|xr, yr| {
            for (o, &src) in inner.iter().enumerate() {
                dx[xr + src] = dx[xr + src] + dy[yr + o];
            }
        });
    }
}

impl<T: Element> Function<T> for Shift<T> {
    fn name(&self) -> &str {
        "Shift"
    }

    fn min_inputs(&self) -> usize {
        1
    }

    fn min_outputs(&self) -> usize {
        1
    }

    fn context(&self) -> &Context {
        &self.ctx
    }

    fn copy(&self) -> Box<dyn Function<T>> {
        Box::new(Shift::<T>::with_mode(self.shifts.clone(), self.border_mode).with_context(self.ctx.clone()))
    }

    fn setup_impl(&mut self, inputs: &[&Variable<T>], outputs: &mut [&mut Variable<T>]) -> Result<()> {
        let shape = inputs[0].shape().to_vec();
        self.prepare_addr_table(&shape)?;
        outputs[0].reshape(&shape);
        debug!("Shift set up for {:?} ({}, shifts {:?})", shape, self.border_mode, self.shifts);
        Ok(())
    }

    fn forward_impl(&mut self, inputs: &[&Variable<T>], outputs: &mut [&mut Variable<T>]) -> Result<()> {
        self.forward_into(&inputs[0].data.view(), &mut outputs[0].data.view_mut())
    }

    fn backward_impl(
        &mut self,
        inputs: &mut [&mut Variable<T>],
        outputs: &[&Variable<T>],
        propagate_down: &[bool],
        accum: &[bool],
    ) -> Result<()> {
        if !propagate_down[0] {
            debug!("Shift backward skipped, input does not need a gradient");
            return Ok(());
        }
        if !accum[0] {
            let table = self.table_for(inputs[0].grad.shape())?;
            same_shape("output gradient", table, outputs[0].grad.shape())?;
            inputs[0].zero_grad();
        }
        self.backward_into(&outputs[0].grad.view(), &mut inputs[0].grad.view_mut())
    }
}

/// Registry constructor for `"Shift"`; `args` is a RON encoded [`ShiftArgs`].
pub fn create_shift<T: Element>(ctx: &Context, args: &str) -> Result<Box<dyn Function<T>>> {
    let mut shift_args = ShiftArgs::default();
    shift_args.load_config(args)?;
    Ok(Box::new(Shift::<T>::from_args(ctx, &shift_args)?))
}

/// Saved state of a functional [`shift`] call, consumed by [`dshift`].
pub struct ShiftCtx {
    table: AddrTable,
}

impl ShiftCtx {
    pub fn addr_table(&self) -> &AddrTable {
        &self.table
    }
}

pub fn shift<T: Float>(x: &ArrayViewD<T>, shifts: &[i64], border_mode: BorderMode) -> Result<(ArrayD<T>, ShiftCtx)> {
    let table = AddrTable::build(x.shape(), shifts, border_mode)?;
    let x = x.as_standard_layout();
    let xs = x.as_slice().ok_or_else(|| anyhow!("input is not contiguous"))?;
    let mut y = ArrayD::zeros(x.raw_dim());
    gather(&table, xs, contiguous_mut(&mut y)?);
    Ok((y, ShiftCtx { table }))
}

pub fn dshift<T: Float>(ctx: &ShiftCtx, grad: &ArrayViewD<T>) -> Result<ArrayD<T>> {
    same_shape("output gradient", &ctx.table, grad.shape())?;
    let grad = grad.as_standard_layout();
    let dys = grad.as_slice().ok_or_else(|| anyhow!("output gradient is not contiguous"))?;
    let mut dx = ArrayD::zeros(grad.raw_dim());
    scatter_add(&ctx.table, dys, contiguous_mut(&mut dx)?);
    Ok(dx)
}
