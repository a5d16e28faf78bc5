pub mod client;
pub mod hooks;
pub mod installation;

pub use client::{
    ClientConfig, ClientError, ConnectionStats, DeliveryClient, HttpClient, MAX_TRANSPORT_TIMEOUT,
    ProxySettings,
};
pub use hooks::MessageHooks;
pub use installation::{AssemblyInfo, Installation, LoggerInfo};
