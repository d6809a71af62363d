pub mod demo;
pub mod run;
pub mod samplers;
pub mod version;
