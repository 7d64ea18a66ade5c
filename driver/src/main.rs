use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use clap::Parser;
use driver::{IntoArgs, Naming, PipelineArgs, Sample};
use env_logger::Env;
use serde::Deserialize;

#[derive(Parser, Debug)]
struct CommandLine {
    #[clap(flatten)]
    command_line: Config,
    #[clap(long, value_name = "FILE")]
    /// Path to the config file
    config: Option<PathBuf>,
    #[clap(long)]
    /// List the built-in samples and exit
    list: bool,
}

#[derive(clap::Args, Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct Config {
    #[clap(short, long, value_enum)]
    /// The built-in graph to compile
    sample: Option<Sample>,
    #[clap(short, long)]
    /// Number of registers available to the allocator
    registers: Option<usize>,
    #[clap(short, long, value_delimiter = ',')]
    /// Passes to run before scheduling, in order
    passes: Option<Vec<String>>,
    #[clap(long)]
    /// Check the graph shape before analysing it
    verify: Option<bool>,
    #[clap(long, value_enum)]
    /// How nodes are named in the output
    names: Option<Naming>,
}

impl Config {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let config = fs::read_to_string(path)
            .with_context(|| format!("cannot read `{}`", path.display()))?;
        toml::from_str(&config).with_context(|| format!("cannot parse `{}`", path.display()))
    }

    fn merge(self, other: Self) -> Self {
        Self {
            sample: self.sample.or(other.sample),
            registers: self.registers.or(other.registers),
            passes: self.passes.or(other.passes),
            verify: self.verify.or(other.verify),
            names: self.names.or(other.names),
        }
    }
}

impl IntoArgs for Config {
    fn into_args(self) -> PipelineArgs {
        PipelineArgs {
            sample: self
                .sample
                .unwrap_or_else(|| exit_with("a sample is required")),
            registers: self.registers.unwrap_or(3),
            passes: self.passes.unwrap_or_default(),
            verify: self.verify.unwrap_or(true),
            naming: self.names.unwrap_or_default(),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let command_line = CommandLine::parse();

    if command_line.list {
        for sample in Sample::ALL {
            println!("{:<14} {}", sample.name(), sample.description());
        }
        return ExitCode::SUCCESS;
    }

    let config = match command_line.config.as_ref().map(|path| Config::load(path)) {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            log::error!("{err:#}");
            return ExitCode::FAILURE;
        }
        None => Config::default(),
    };
    let config = command_line.command_line.merge(config);
    driver::run_compiler(config.into_args())
}

fn exit_with(message: &'static str) -> ! {
    <CommandLine as clap::CommandFactory>::command()
        .error(clap::error::ErrorKind::MissingRequiredArgument, message)
        .exit();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_overrides_the_file() {
        let file: Config = toml::from_str(
            r#"
            sample = "diamond"
            registers = 5
            passes = ["peephole"]
            names = "plain"
            "#,
        )
        .unwrap();
        let command_line = Config {
            registers: Some(2),
            ..Config::default()
        };
        let args = command_line.merge(file).into_args();
        assert_eq!(args.sample, Sample::Diamond);
        assert_eq!(args.registers, 2);
        assert_eq!(args.passes, vec!["peephole".to_string()]);
        assert!(args.verify);
        assert_eq!(args.naming, Naming::Plain);
    }

    #[test]
    fn dump_names_default_to_node_indices() {
        let config = Config {
            sample: Some(Sample::StraightLine),
            ..Config::default()
        };
        let args = config.into_args();
        assert_eq!(args.naming, Naming::Index);
        assert_eq!(args.registers, 3);
        assert!(args.passes.is_empty());
    }
}
