//! Solves the rectangle Poisson problem and writes the solution and the solver report as JSON.
//!
//! Usage: `cargo run --release --example poisson_rectangle [domain_size] [degree] [output_dir]`
use eyre::{eyre, WrapErr};
use std::path::PathBuf;
use weakgrid::driver::{solve, SolverSettings};
use weakgrid::io::{write_field_json, write_report_json};
use weakgrid::problem::WeakFormProblem;
use weakgrid::scenarios::poisson_rectangle;

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
    let domain_size: usize = parse_arg(&args, 0, 64)?;
    let degree: usize = parse_arg(&args, 1, 1)?;
    let output_dir = PathBuf::from(parse_arg(&args, 2, "data/poisson_rectangle".to_string())?);

    let problem = poisson_rectangle::<f64>(domain_size, degree).wrap_err("Failed to set up problem")?;
    let mut field = problem.constant_field(0.0);
    let mut settings = SolverSettings::default();
    settings.max_outer_steps = 100;
    settings.lbfgs.max_iterations = 10;
    // The loss is averaged over elements, so its gradient entries are tiny
    settings.lbfgs.tolerance_grad = 1e-14;
    settings.lbfgs.tolerance_change = 1e-16;
    settings.early_stopping.min_delta = 0.0;

    let report = solve(&problem, &mut field, &settings)?;
    let solution = problem.apply_boundary_conditions(&field)?;

    let grid = solution.component(0, 0);
    let rows = grid.nrows();
    let mut abs_error = 0.0;
    for i in 0..rows {
        let y = i as f64 / (rows - 1) as f64;
        for j in 0..grid.ncols() {
            abs_error += (grid[(i, j)] - (1.0 - y)).abs();
        }
    }
    let mae = abs_error / grid.len() as f64;

    println!("Stopped after {} steps: {:?}", report.num_steps(), report.stop_reason);
    println!("Final loss: {:e}", report.final_loss);
    println!("Mean absolute error against u = 1 - y: {:e}", mae);

    write_field_json(output_dir.join("solution.json"), &solution)?;
    write_report_json(output_dir.join("report.json"), &report)?;
    println!("Wrote results to {}", output_dir.display());
    Ok(())
}
