// Simulation parameters and command line parsing

use thiserror::Error;

use crate::experiment::SweepMode;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Missing value for {0}")]
    MissingValue(&'static str),

    #[error("Unknown option {0}")]
    UnknownOption(String),

    #[error("Too many positional arguments: {0}")]
    UnexpectedArgument(String),

    #[error("{0}")]
    OutOfRange(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub node_count: usize,
    pub edge_probability: f64,
    pub transaction_count: usize,
    pub max_amount: u64,
    pub iterations: usize,
    pub max_fee_rate: f64,
    pub mode: SweepMode,
    pub seed: Option<u64>,
    pub output_path: String,
    pub verbose: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            node_count: 150,
            edge_probability: 0.1,
            transaction_count: 2_000,
            max_amount: 100_000,
            iterations: 100,
            max_fee_rate: 0.5,
            mode: SweepMode::Fresh,
            seed: None,
            output_path: "channel_fee_variation.csv".to_string(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(SimConfig),
    Help,
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue { name, value: value.to_string() })
}

impl SimConfig {
    /// Parse `[nodes] [transactions] [iterations] [seed]` plus options.
    /// `args` excludes the program name. Missing positionals keep defaults.
    pub fn from_args(args: &[String]) -> Result<Command, ConfigError> {
        let mut config = SimConfig::default();
        let mut positional = 0;
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let mut next_value = |name: &'static str| iter.next().ok_or(ConfigError::MissingValue(name));

            match arg.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "--cumulative" => config.mode = SweepMode::Cumulative,
                "--fresh" => config.mode = SweepMode::Fresh,
                "-v" | "--verbose" => config.verbose = true,
                "-o" | "--output" => config.output_path = next_value("--output")?.clone(),
                "--edge-prob" => config.edge_probability = parse_value("--edge-prob", next_value("--edge-prob")?)?,
                "--max-amount" => config.max_amount = parse_value("--max-amount", next_value("--max-amount")?)?,
                "--max-fee-rate" => {
                    config.max_fee_rate = parse_value("--max-fee-rate", next_value("--max-fee-rate")?)?
                }
                option if option.starts_with('-') => return Err(ConfigError::UnknownOption(option.to_string())),
                value => {
                    match positional {
                        0 => config.node_count = parse_value("nodes", value)?,
                        1 => config.transaction_count = parse_value("transactions", value)?,
                        2 => config.iterations = parse_value("iterations", value)?,
                        3 => config.seed = Some(parse_value("seed", value)?),
                        _ => return Err(ConfigError::UnexpectedArgument(value.to_string())),
                    }
                    positional += 1;
                }
            }
        }

        config.validate()?;
        Ok(Command::Run(config))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_count < 2 {
            return Err(ConfigError::OutOfRange("at least two nodes are needed".to_string()));
        }
        if !(self.edge_probability > 0.0 && self.edge_probability <= 1.0) {
            return Err(ConfigError::OutOfRange(format!("edge probability {} is not in (0, 1]",
                                                       self.edge_probability)));
        }
        if self.max_amount == 0 {
            return Err(ConfigError::OutOfRange("maximum amount must be positive".to_string()));
        }
        if !self.max_fee_rate.is_finite() || self.max_fee_rate < 0.0 {
            return Err(ConfigError::OutOfRange(format!("maximum fee rate {} must be non-negative",
                                                       self.max_fee_rate)));
        }
        Ok(())
    }
}

// Display usage information
pub fn usage() -> String {
    [
        "lnfee: fee-aware routing simulator for payment channel networks",
        "",
        "Usage:",
        "  lnfee [nodes] [transactions] [iterations] [seed] [options]",
        "",
        "Arguments:",
        "  nodes          - Number of nodes in the network (default: 150)",
        "  transactions   - Transactions replayed per iteration (default: 2000)",
        "  iterations     - Fee rates swept on the target channel (default: 100)",
        "  seed           - RNG seed for reproducible runs (default: random)",
        "",
        "Options:",
        "  --cumulative          Keep balances between iterations instead of resetting",
        "  --edge-prob <p>       Channel probability per node pair (default: 0.1)",
        "  --max-amount <sat>    Largest generated payment (default: 100000)",
        "  --max-fee-rate <r>    Highest swept fee rate (default: 0.5)",
        "  -o, --output <path>   CSV output path (default: channel_fee_variation.csv)",
        "  -v, --verbose         Debug logging",
        "",
        "Example:",
        "  lnfee 50 500 20 42 --cumulative",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn run_config(list: &[&str]) -> SimConfig {
        match SimConfig::from_args(&args(list)).unwrap() {
            Command::Run(config) => config,
            Command::Help => panic!("expected a run configuration"),
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(run_config(&[]), SimConfig::default());
    }

    #[test]
    fn test_positionals_and_options() {
        let config = run_config(&["50", "500", "20", "42", "--cumulative", "-o", "out.csv", "--edge-prob", "0.3"]);
        assert_eq!(config.node_count, 50);
        assert_eq!(config.transaction_count, 500);
        assert_eq!(config.iterations, 20);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.mode, SweepMode::Cumulative);
        assert_eq!(config.output_path, "out.csv");
        assert_eq!(config.edge_probability, 0.3);
    }

    #[test]
    fn test_help() {
        assert_eq!(SimConfig::from_args(&args(&["--help"])).unwrap(), Command::Help);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(SimConfig::from_args(&args(&["many"])), Err(ConfigError::InvalidValue { name: "nodes", .. })));
        assert_eq!(SimConfig::from_args(&args(&["--output"])).unwrap_err(), ConfigError::MissingValue("--output"));
        assert_eq!(SimConfig::from_args(&args(&["--bogus"])).unwrap_err(),
                   ConfigError::UnknownOption("--bogus".to_string()));
        assert!(matches!(SimConfig::from_args(&args(&["1", "2", "3", "4", "5"])),
                         Err(ConfigError::UnexpectedArgument(_))));
        assert!(matches!(SimConfig::from_args(&args(&["1"])), Err(ConfigError::OutOfRange(_))));
        assert!(matches!(SimConfig::from_args(&args(&["--edge-prob", "1.5"])), Err(ConfigError::OutOfRange(_))));
    }
}
