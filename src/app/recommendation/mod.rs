//! AI 推荐模块
//!
//! `prompt` 是纯函数部分，`service` 负责拉数据和调用推理服务。

pub mod prompt;
pub mod service;
pub mod types;

pub use service::{RecommendationComposer, RecommendationConfig};
pub use types::{
    CandidateScope, RecommendationSource, RecommendationType, RecommendedItem, Recommendations,
    ViewerSignals,
};
