pub mod mustakshif;

pub use mustakshif::ExplorerReport;
pub use mustakshif::Mustakshif;
pub use mustakshif::MustakshifArgs;
