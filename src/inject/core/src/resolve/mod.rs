pub mod context;
pub mod injector;
