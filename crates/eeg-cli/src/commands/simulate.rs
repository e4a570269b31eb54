use crate::cli::SimulateArgs;
use crate::commands::exit_code_for;
use crate::exit_codes;
use eeg_simulation::{write_csv_file, RecordingSimulator, SignalPattern, SimulationConfig};

pub fn execute(args: SimulateArgs) -> i32 {
    let config = SimulationConfig {
        sample_rate_hz: args.rate,
        duration_s: args.duration,
        seed: args.seed,
        jitter_ms: args.jitter_ms,
        ..SimulationConfig::default()
    };

    if !(args.noise_uv.is_finite() && args.noise_uv >= 0.0) {
        eprintln!("Error: --noise-uv must be a non-negative number");
        return exit_codes::USAGE_ERROR;
    }

    let mut simulator = match RecordingSimulator::alpha_scenario(config, args.burst_at) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::USAGE_ERROR;
        }
    };
    if args.noise_uv > 0.0 {
        simulator = simulator.with_pattern(SignalPattern::GaussianNoise { std_dev: args.noise_uv });
    }
    let samples = simulator.generate();

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error: Failed to create '{}': {}", parent.display(), e);
            return exit_codes::RECORDING_FAILURE;
        }
    }

    match write_csv_file(&samples, &args.output) {
        Ok(()) => {
            println!(
                "Wrote {} samples ({} s at {} Hz) to {}",
                samples.len(),
                args.duration,
                args.rate,
                args.output.display()
            );
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code_for(&e)
        }
    }
}
