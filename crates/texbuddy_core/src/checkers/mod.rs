//! Built-in checkers.
//!
//! `Detex`, the LaTeX style checks and `BibtexDuplicates` run in-process.
//! `Chktex` and `Aspell` drive external tools through [`crate::process`].

mod aspell;
mod bibtex;
mod chktex;
mod detex;
mod latex;

pub use aspell::Aspell;
pub use bibtex::BibtexDuplicates;
pub use chktex::Chktex;
pub use detex::Detex;
pub use latex::{EmptySections, NativeUseOfRef, SiUnitx, UnreferencedFigures, UrlCheck};

use crate::checker::CheckerRegistry;

pub(crate) fn register_builtins(registry: &mut CheckerRegistry) {
    registry.register(Detex::NAME, || Box::new(Detex));
    registry.register(UnreferencedFigures::NAME, || Box::new(UnreferencedFigures));
    registry.register(SiUnitx::NAME, || Box::new(SiUnitx));
    registry.register(EmptySections::NAME, || Box::new(EmptySections));
    registry.register(UrlCheck::NAME, || Box::new(UrlCheck));
    registry.register(NativeUseOfRef::NAME, || Box::new(NativeUseOfRef));
    registry.register(BibtexDuplicates::NAME, || Box::new(BibtexDuplicates));
    registry.register(Chktex::NAME, || Box::new(Chktex));
    registry.register(Aspell::NAME, || Box::new(Aspell));
}
