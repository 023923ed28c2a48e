pub mod numbering;
pub mod scope;
pub mod status;
pub mod totals;
