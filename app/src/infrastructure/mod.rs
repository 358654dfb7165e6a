pub mod command;
pub mod ioc;
pub mod service;
