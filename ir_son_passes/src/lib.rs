use ir_son::Program;

mod checks_elimination;
mod constant_folding;
mod inlining;
mod peephole;

pub use checks_elimination::ChecksElimination;
pub use constant_folding::ConstantFolding;
pub use inlining::Inlining;
pub use peephole::Peephole;

pub trait SonPass {
    fn run_pass(&mut self, program: &mut Program);
}

/// Names accepted by [`pass_by_name`].
pub const PASS_NAMES: &[&str] = &[
    "constant-folding",
    "peephole",
    "checks-elimination",
    "inlining",
];

pub fn pass_by_name(name: &str) -> Option<Box<dyn SonPass>> {
    match name {
        "constant-folding" => Some(Box::new(ConstantFolding)),
        "peephole" => Some(Box::new(Peephole)),
        "checks-elimination" => Some(Box::new(ChecksElimination)),
        "inlining" => Some(Box::new(Inlining)),
        _ => None,
    }
}
