//! Solves the transversal Poisson problem for a sequence of seeded KL-sum diffusivity fields
//! and stores the metrics of every run.
//!
//! Usage: `cargo run --release --example diffusivity_study [num_samples] [domain_size] [output_dir]`
use eyre::{eyre, WrapErr};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::BufWriter;
use std::path::PathBuf;
use weakgrid::driver::{solve, SolverSettings, StopReason};
use weakgrid::grid::GridShape;
use weakgrid::io::write_field_json;
use weakgrid::problem::WeakFormProblem;
use weakgrid::scenarios::{kl_sum_diffusivity, poisson_transversal, sample_kl_coefficients};

#[derive(Debug, Serialize)]
struct RunMetrics {
    index: usize,
    coefficients: [f64; 6],
    steps: usize,
    stop_reason: StopReason,
    final_loss: f64,
    /// Mean of `u` over the grid, the quantity of interest of the study.
    mean_solution: f64,
}

fn parse_arg<T: std::str::FromStr>(args: &[String], index: usize, default: T) -> eyre::Result<T> {
    match args.get(index) {
        Some(arg) => arg
            .parse()
            .map_err(|_| eyre!("Invalid argument at position {}: {}", index, arg)),
        None => Ok(default),
    }
}

fn main() -> eyre::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let num_samples: usize = parse_arg(&args, 0, 8)?;
    let domain_size: usize = parse_arg(&args, 1, 64)?;
    let output_dir = PathBuf::from(parse_arg(&args, 2, "data/diffusivity_study".to_string())?);

    let shape = GridShape::square(domain_size);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let samples = sample_kl_coefficients(num_samples, &mut rng);

    let mut settings = SolverSettings::default();
    settings.max_outer_steps = 100;
    settings.lbfgs.max_iterations = 10;
    settings.lbfgs.tolerance_grad = 1e-14;
    settings.lbfgs.tolerance_change = 1e-16;
    settings.early_stopping.min_delta = 0.0;

    let mut metrics = Vec::with_capacity(num_samples);
    for (index, coefficients) in samples.iter().enumerate() {
        let diffusivity = kl_sum_diffusivity(shape, &coefficients[..]);
        let problem = poisson_transversal(vec![diffusivity], 1)
            .wrap_err_with(|| format!("Failed to set up run {}", index))?;
        let mut field = problem.constant_field(1.0);
        let report = solve(&problem, &mut field, &settings)?;
        let solution = problem.apply_boundary_conditions(&field)?;
        let u = solution.component(0, 0);

        println!(
            "Run {}: {:?} after {} steps, final loss {:e}",
            index,
            report.stop_reason,
            report.num_steps(),
            report.final_loss
        );
        write_field_json(output_dir.join(format!("solution_{}.json", index)), &solution)?;
        metrics.push(RunMetrics {
            index,
            coefficients: *coefficients,
            steps: report.num_steps(),
            stop_reason: report.stop_reason,
            final_loss: report.final_loss,
            mean_solution: u.mean(),
        });
    }

    create_dir_all(&output_dir).wrap_err("Failed to create output directory")?;
    let path = output_dir.join("metrics.json");
    let file = File::create(&path).wrap_err_with(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &metrics)?;
    println!("Wrote metrics of {} runs to {}", metrics.len(), path.display());
    Ok(())
}
