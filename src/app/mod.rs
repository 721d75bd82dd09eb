//! Camaraderie 客户端核心逻辑
//!
//! 平台访问层（`platform`）之上是各个服务：登录态、语言、主播发现、推荐、
//! 教练评分、观众成长、警告轮询，最后由 `client` 统一组装。

pub mod auth;
pub mod cache;
pub mod client;
pub mod coaching;
pub mod db;
pub mod discovery;
pub mod filter;
pub mod journey;
pub mod language;
pub mod models;
pub mod platform;
pub mod recommendation;
pub mod storage;
pub mod types;
pub mod warnings;
