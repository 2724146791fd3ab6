pub(crate) mod server;
pub(crate) mod source;
pub(crate) mod workload;
