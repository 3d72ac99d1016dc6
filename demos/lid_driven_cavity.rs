//! Solves the lid-driven cavity from a seeded random initial guess.
//!
//! Usage: `cargo run --release --example lid_driven_cavity [domain_size] [reynolds] [output_dir]`
use eyre::{eyre, WrapErr};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use weakgrid::driver::{solve, SolverSettings};
use weakgrid::field::NodalField;
use weakgrid::io::{write_field_json, write_report_json};
use weakgrid::problem::WeakFormProblem;
use weakgrid::scenarios::{lid_driven_cavity, LidProfile};
use weakgrid::stokes::{PRESSURE, VELOCITY_X, VELOCITY_Y};

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
    let domain_size: usize = parse_arg(&args, 0, 32)?;
    let reynolds: f64 = parse_arg(&args, 1, 10.0)?;
    let output_dir = PathBuf::from(parse_arg(&args, 2, "data/lid_driven_cavity".to_string())?);

    let problem = lid_driven_cavity::<f64>(domain_size, reynolds, 1, LidProfile::Uniform(1.0))
        .wrap_err("Failed to set up problem")?;
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let mut field = NodalField::random_uniform(1, 3, problem.grid_shape(), -0.01, 0.01, &mut rng);

    let mut settings = SolverSettings::default();
    settings.max_outer_steps = 500;
    let report = solve(&problem, &mut field, &settings)?;
    let solution = problem.apply_boundary_conditions(&field)?;

    println!("Stopped after {} steps: {:?}", report.num_steps(), report.stop_reason);
    println!("Final loss: {:e}", report.final_loss);
    let center = domain_size / 2;
    println!(
        "Center values: u = {:.4}, v = {:.4}, p = {:.4}",
        solution.component(0, VELOCITY_X)[(center, center)],
        solution.component(0, VELOCITY_Y)[(center, center)],
        solution.component(0, PRESSURE)[(center, center)]
    );

    write_field_json(output_dir.join("solution.json"), &solution)?;
    write_report_json(output_dir.join("report.json"), &report)?;
    println!("Wrote results to {}", output_dir.display());
    Ok(())
}
