pub mod error;
pub mod evaluation;
pub mod input;
mod log;
pub mod metrics;
pub mod oracle;
pub mod output;
pub mod scenario;
pub mod solver;
pub mod subproblem;
pub mod system;
pub mod utils;
use error::Error;
use evaluation::SweepSettings;
use input::Input;
use oracle::HighsOracle;
use std::time::Instant;

pub fn run(input_args: &InputArgs) -> Result<(), Error> {
    log::show_greeting();

    let begin = Instant::now();
    let input = Input::build(&input_args.path)?;
    let config = &input.config;
    let system = &input.system;

    log::input_reading_line(&input_args.path);

    let settings = SweepSettings::from_config(config)?;
    let oracle = HighsOracle::new(config.solver_options());
    let records =
        evaluation::sweep(system, &config.deltas, &settings, &oracle)?;

    log::output_generation_line(&input_args.path);
    output::generate_outputs(&records, &input_args.path)?;

    log::show_farewell(begin.elapsed());

    Ok(())
}

pub struct InputArgs {
    pub path: String,
}

impl InputArgs {
    pub fn build(args: &[String]) -> Result<Self, &'static str> {
        if args.len() < 2 {
            return Err("Not enough arguments [PATH]");
        }

        let path = args[1].clone();

        Ok(Self { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_args_require_a_path() {
        let args = vec!["facloc".to_string()];
        assert!(InputArgs::build(&args).is_err());
    }

    #[test]
    fn test_input_args_take_the_first_argument() {
        let args = vec![
            "facloc".to_string(),
            "example".to_string(),
            "ignored".to_string(),
        ];
        let input_args = InputArgs::build(&args).unwrap();
        assert_eq!(input_args.path, "example");
    }
}
