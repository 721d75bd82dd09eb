pub mod app;

// 重新导出常用类型，方便外部使用
pub use app::{
    client::{CamaraderieClient, ClientConfig},
    filter::BroadcasterFilter,
    models::{Broadcaster, User, UserRole, UserStatus},
    platform::{HttpPlatform, MemoryPlatform, Platform},
    recommendation::Recommendations,
};
