use std::fmt::{self, Display, Formatter};

use anyhow::{bail, Context};
use ir_son::{
    analysis::{DomTree, Liveness, LoopInfo, RegAlloc, Schedule},
    Function, FunctionPrinter, NodeNames, Program,
};

use crate::{Naming, PipelineArgs};

/// Everything computed for one function, ready to print.
pub struct FunctionReport {
    pub name: String,
    pub dump: String,
    pub loops: usize,
    pub regions: usize,
    pub alloc: RegAlloc,
    pub allocation: String,
}

impl Display for FunctionReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.dump)?;
        writeln!(
            f,
            "; {} regions, {} loops, {} registers, {} stack slots",
            self.regions,
            self.loops,
            self.alloc.num_registers(),
            self.alloc.stack_slots()
        )?;
        write!(f, "{}", self.allocation)
    }
}

/// Run the requested passes over `program`, then analyse and allocate
/// every function.
pub fn run_pipeline(
    program: &mut Program,
    args: &PipelineArgs,
) -> anyhow::Result<Vec<FunctionReport>> {
    for name in &args.passes {
        let Some(mut pass) = ir_son_passes::pass_by_name(name) else {
            bail!(
                "unknown pass `{name}`, expected one of: {}",
                ir_son_passes::PASS_NAMES.join(", ")
            );
        };
        log::debug!("running pass `{name}`");
        pass.run_pass(program);
    }

    program
        .functions
        .iter()
        .map(|function| {
            report(function, args).with_context(|| format!("in function `{}`", function.name()))
        })
        .collect()
}

fn report(function: &Function, args: &PipelineArgs) -> anyhow::Result<FunctionReport> {
    if args.verify {
        if let Err(errors) = function.verify() {
            let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
            bail!("the graph is malformed:\n  {}", errors.join("\n  "));
        }
    }

    let dom = DomTree::new(function);
    let loops = LoopInfo::new(function, &dom);
    let schedule = Schedule::new(function, &dom, &loops);
    let liveness = Liveness::with_analyses(function, &loops, &schedule);
    let alloc = RegAlloc::new(args.registers, &liveness);

    let names = match args.naming {
        Naming::Index => NodeNames::new(function),
        Naming::Plain => NodeNames::sequential(function, &schedule),
    };
    let dump = FunctionPrinter::new(function, &schedule, &names).to_string();
    let allocation = alloc.dump(&names).to_string();

    log::info!(
        "`{}`: {} regions, {} loops, {} values, {} spilled",
        function.name(),
        schedule.linear_order().len(),
        loops.len(),
        alloc.iter().count(),
        alloc.stack_slots()
    );

    Ok(FunctionReport {
        name: function.name().to_owned(),
        dump,
        loops: loops.len(),
        regions: schedule.linear_order().len(),
        alloc,
        allocation,
    })
}
