mod data;
mod train;

use std::path::PathBuf;

use anyhow::Result;
use risk_core::{MODEL_FILE, ModelArtifacts, SCALER_FILE};

use crate::data::{DEFAULT_SAMPLES, DEFAULT_SEED, generate_cohort, split_cohort};
use crate::train::{accuracy, fit_classifier, fit_scaler};

fn main() -> Result<()> {
    println!("Clinical Risk Model Trainer");
    println!("===========================");

    // Output directory from the command line, "models" by default
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [output_dir]", args[0]);
        std::process::exit(1);
    }
    let out_dir = PathBuf::from(args.get(1).map(String::as_str).unwrap_or("models"));

    println!("Step 1: Generating synthetic cohort");
    let cohort = generate_cohort(DEFAULT_SAMPLES, DEFAULT_SEED)?;
    let positives = cohort.iter().filter(|s| s.high_risk).count();
    println!("   {} patients, {} high risk", cohort.len(), positives);

    let (train, test) = split_cohort(cohort, 0.8, DEFAULT_SEED);
    println!("   split: {} train / {} test", train.len(), test.len());
    println!();

    println!("Step 2: Fitting scaler and classifier");
    let scaler = fit_scaler(&train);
    let classifier = fit_classifier(&scaler, &train);
    println!(
        "   train accuracy: {:.3}",
        accuracy(&scaler, &classifier, &train)
    );
    println!(
        "   test accuracy:  {:.3}",
        accuracy(&scaler, &classifier, &test)
    );
    println!();

    println!("Step 3: Writing artifacts");
    let artifacts = ModelArtifacts { scaler, classifier };
    artifacts.persist(&out_dir)?;
    println!(
        "   wrote {} and {}",
        out_dir.join(SCALER_FILE).display(),
        out_dir.join(MODEL_FILE).display()
    );
    println!();

    println!("Training complete");

    Ok(())
}
