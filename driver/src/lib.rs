use std::{io::Write, process::ExitCode};

mod pipeline;
pub mod samples;

pub use pipeline::{run_pipeline, FunctionReport};
pub use samples::Sample;

/// How values and regions are named in the printed output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Naming {
    /// `%N`, the node's index in the graph.
    #[default]
    Index,
    /// `n0, n1, ...` for regions and `v0, v1, ...` for values.
    Plain,
}

pub struct PipelineArgs {
    pub sample: Sample,
    pub registers: usize,
    pub passes: Vec<String>,
    pub verify: bool,
    pub naming: Naming,
}

pub trait IntoArgs {
    fn into_args(self) -> PipelineArgs;
}

pub fn run_compiler(args: PipelineArgs) -> ExitCode {
    let mut program = args.sample.build();
    log::info!(
        "running `{}` ({})",
        args.sample.name(),
        args.sample.description()
    );

    let reports = match run_pipeline(&mut program, &args) {
        Ok(reports) => reports,
        Err(err) => {
            log::error!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout().lock();
    for report in reports {
        if let Err(err) = writeln!(stdout, "{report}") {
            log::error!("cannot write the report: {err}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
