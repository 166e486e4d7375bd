pub mod forcefield;
pub mod options;
pub mod run;
