use crate::cli::ProcessArgs;
use crate::commands::{build_config, exit_code_for, print_summary};
use crate::exit_codes;
use eeg_processing::Pipeline;
use std::path::{Path, PathBuf};

/// Directory holding `input`, or the working directory for a bare file name
fn input_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub fn execute(args: ProcessArgs) -> i32 {
    let pipeline = build_config(&args.pipeline).and_then(|config| Ok(Pipeline::new(config)?));
    let pipeline = match pipeline {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return exit_codes::USAGE_ERROR;
        }
    };

    let output_dir = args.output_dir.clone().unwrap_or_else(|| input_dir(&args.input));

    match pipeline.process_file(&args.input, &output_dir) {
        Ok((result, report)) => {
            for warning in &report.warnings {
                eprintln!("Warning: {}", warning);
            }
            print_summary(&report, result.summary());
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: failed to process '{}': {}", args.input.display(), e);
            exit_code_for(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_dir() {
        assert_eq!(input_dir(Path::new("data/eeg_recording_01.csv")), PathBuf::from("data"));
        assert_eq!(input_dir(Path::new("eeg_recording_01.csv")), PathBuf::from("."));
    }
}
