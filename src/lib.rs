pub mod cli;
pub mod import;
pub mod tracing;

pub mod util {
    pub mod db;
    pub mod env;
}
