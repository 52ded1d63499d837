//! # shift-ops
//!
//! An N-dimensional shift operator with a reverse-mode gradient.
//!
//! Every element moves by a fixed signed offset per axis; positive offsets
//! move content toward higher coordinates, so `y[i] = x[i - shift]`. Positions
//! left uncovered at the array borders are filled by a [`BorderMode`]:
//! `nearest` repeats the edge element, `reflect` mirrors about it.
//!
//! ```
//! use ndarray::array;
//! use shift_lib::{shift, dshift, BorderMode};
//!
//! let x = array![[1.0, 2.0, 3.0, 4.0]].into_dyn();
//! let (y, ctx) = shift(&x.view(), &[0, 1], BorderMode::Nearest).unwrap();
//! assert_eq!(y, array![[1.0, 1.0, 2.0, 3.0]].into_dyn());
//!
//! let dx = dshift(&ctx, &array![[1.0, 1.0, 1.0, 1.0]].into_dyn().view()).unwrap();
//! assert_eq!(dx, array![[2.0, 1.0, 1.0, 0.0]].into_dyn());
//! ```

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

pub mod addr_table;
pub mod border;
pub mod error;
pub mod function;
pub mod shape;
pub mod shift;
pub mod utils;

pub use addr_table::AddrTable;
pub use border::BorderMode;
pub use error::ShiftError;
pub use function::{Context as FunctionContext, DType, Element, Function, FunctionRegistry, Variable};
pub use shift::{dshift, shift, Shift, ShiftArgs, ShiftCtx};

/// Anything serde can round trip is configurable through RON text.
pub trait Config: Send + Sync {
    fn config(&self) -> Result<String>;
    fn load_config(&mut self, config: &str) -> Result<()>;
}

impl<T: Serialize + DeserializeOwned + Send + Sync> Config for T {
    fn config(&self) -> Result<String> {
        ron::to_string(self).context("Failed to serialize config")
    }
    fn load_config(&mut self, config: &str) -> Result<()> {
        *self = ron::from_str(config).context(format!("Failed to load config {}", config))?;
        Ok(())
    }
}

#[test]
fn config_round_trip() {
    let args = ShiftArgs {
        shifts: vec![-3, 2],
        border_mode: "reflect".to_string(),
    };
    let text = args.config().unwrap();
    let mut loaded = ShiftArgs::default();
    loaded.load_config(&text).unwrap();
    assert_eq!(loaded, args);
    assert!(loaded.load_config("(shifts: oops)").is_err());
}
