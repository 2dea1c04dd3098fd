// # Exporter Implementations

pub mod hosts;

pub use hosts::HostsFileExporter;
