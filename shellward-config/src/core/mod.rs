pub mod exec;

pub use exec::ExecConfig;
