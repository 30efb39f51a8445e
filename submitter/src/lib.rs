//! Submit batches of independent shell commands to a local pool, SGE, Condor or the OSG
//!
//! A [`job::Batch`] is rendered into wrapper scripts, submit descriptors and a manifest inside
//! its job directory, then handed to the backend selected by [`config::ExecutorConfig`].

pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod executors;
pub mod job;
pub mod limiter;
pub mod manifest;
pub mod script;
pub mod spinner;

#[cfg(test)]
mod dispatch_test;
#[cfg(test)]
mod manifest_test;
#[cfg(test)]
pub(crate) mod test_util;
