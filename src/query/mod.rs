pub mod connections;
pub mod cycles;
pub mod inheritance;
pub mod output;
pub mod stats;
pub mod submodules;
pub mod symbols;

pub use connections::{Connections, RelationGroup};
pub use cycles::UsageCycle;
pub use inheritance::InheritanceNode;
pub use stats::ModuleSummary;
pub use submodules::{SubmoduleSummary, submodule_summaries};
