// Library for tests to access modules

pub mod alerts;
pub mod anomaly;
pub mod clock;
pub mod config;
pub mod history;
pub mod maintenance_worker;
pub mod models;
pub mod pipeline;
pub mod sample_repo;
pub mod sampler;
pub mod sysinfo_repo;
pub mod thresholds;
pub mod worker;
