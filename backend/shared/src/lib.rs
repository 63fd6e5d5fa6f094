pub mod models;
pub mod response;

pub use models::{
    PowerStatus, ServerInfo, ServerForm, ListInput, NumberInput,
    PerformanceSample, NewPerformanceSample, SampleInput,
    CpuUtilization, NetworkStats, PerformanceReport, ServerReport,
    ServerPerformanceSummary, FleetStats, Dashboard,
};
pub use response::ApiResponse;
