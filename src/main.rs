use anyhow::{Context, Result};
use env_logger::Env;
use log::info;
use ndarray::{ArrayD, IxDyn};
use ndarray_rand::RandomExt;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use shift_lib::{Config, FunctionContext, FunctionRegistry, ShiftArgs, Variable};

/// What the demo runs: a random input of `shape` pushed through Shift.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunConfig {
    shape: Vec<usize>,
    function: ShiftArgs,
    seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            shape: vec![2, 5],
            function: ShiftArgs {
                shifts: vec![0, 1],
                border_mode: "nearest".to_string(),
            },
            seed: 0,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut config = RunConfig::default();
    if let Some(path) = std::env::args().nth(1) {
        let text = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path))?;
        config.load_config(&text)?;
    }
    info!("running {}", config.config()?);

    let registry = FunctionRegistry::<f32>::with_defaults();
    let mut f = registry.create("Shift", &FunctionContext::default(), &config.function.config()?)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let data = ArrayD::random_using(IxDyn(&config.shape), Normal::new(0.0f32, 1.0)?, &mut rng);
    let mut x = Variable::from_array(data);
    let mut y = Variable::new(&config.shape);

    f.setup(&[&x], &mut [&mut y])?;
    f.forward(&[&x], &mut [&mut y])?;
    info!("input\n{}", x.data);
    info!("output\n{}", y.data);

    y.grad.fill(1.0);
    f.backward(&mut [&mut x], &[&y], &[true], &[false])?;
    info!("input gradient for a ones output gradient\n{}", x.grad);
    Ok(())
}
