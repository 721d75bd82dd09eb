//! Camaraderie CLI 客户端
//!
//! 非交互式 CLI，用于浏览主播、查看推荐和评分、轮询警告。
//! 默认连接远端平台；指定 `--fixture` 时改用本地 JSON fixture 离线运行。

use anyhow::{Context, Result};
use camaraderie_client::app::auth::EmptySessionListener;
use camaraderie_client::app::client::{CamaraderieClient, ClientConfig};
use camaraderie_client::app::coaching::{
    coaching_tier, overall_score, visibility_boost, warning_level, SessionScores,
};
use camaraderie_client::app::db::create_sqlite_pool_with_migration;
use camaraderie_client::app::filter::BroadcasterFilter;
use camaraderie_client::app::language::Locale;
use camaraderie_client::app::platform::MemoryPlatform;
use camaraderie_client::app::recommendation::CandidateScope;
use camaraderie_client::app::storage::LocalStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Camaraderie CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "camaraderie-cli")]
#[command(about = "Camaraderie CLI 客户端 - 浏览主播、查看推荐和直播评分", long_about = None)]
struct Args {
    /// 平台 API 基础地址
    #[arg(long, env = "CAMARADERIE_API_URL", default_value = "http://localhost:8080/api")]
    api_url: String,

    /// 应用 ID
    #[arg(long, env = "CAMARADERIE_APP_ID", default_value = "camaraderie")]
    app_id: String,

    /// 访问 token，不填则以访客身份访问
    #[arg(long, env = "CAMARADERIE_TOKEN")]
    token: Option<String>,

    /// 本地数据库 URL
    #[arg(long, default_value = "sqlite://camaraderie.db?mode=rwc")]
    db_url: String,

    /// 离线 fixture（JSON），指定后不访问网络
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// 界面语言（en/es/fr/de/pt/it）
    #[arg(long, default_value = "en")]
    locale: String,

    /// 日志级别（默认: info,camaraderie_client=debug）
    #[arg(long, default_value = "info,camaraderie_client=debug")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 按条件浏览主播
    Browse {
        #[arg(long, default_value = "all")]
        gender: String,
        #[arg(long, default_value = "all")]
        country: String,
        /// 可重复指定
        #[arg(long)]
        language: Vec<String>,
        #[arg(long, default_value = "all")]
        ethnicity: String,
        /// 可重复指定
        #[arg(long)]
        category: Vec<String>,
        #[arg(long, default_value = "all")]
        goal: String,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// 为观众生成推荐（默认当前登录用户）
    Recommend {
        #[arg(long)]
        viewer: Option<String>,
        /// 候选范围包含直播中/会话中的主播
        #[arg(long)]
        include_busy: bool,
        /// 推理失败时不使用兜底排序
        #[arg(long)]
        no_fallback: bool,
    },
    /// 计算直播综合评分，参数为 SessionScores JSON
    Score {
        scores: String,
        /// 连续忽略的提示次数
        #[arg(long, default_value = "0")]
        ignored_hints: u32,
    },
    /// 观众统计与里程碑
    Journey {
        #[arg(long)]
        viewer: Option<String>,
    },
    /// 拉取尚未展示过的警告
    Warnings {
        #[arg(long)]
        user: Option<String>,
    },
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .context("无法创建日志文件 debug.log")?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 文件不需要颜色
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("[CLI] 📝 日志已同时输出到控制台和文件: debug.log");
    Ok(())
}

async fn build_client(args: &Args, command: &Command) -> Result<CamaraderieClient> {
    let mut config = ClientConfig::new(args.api_url.clone(), args.app_id.clone());
    config.token = args.token.clone();
    config.storage_db_url = args.db_url.clone();
    config.locale = args.locale.parse::<Locale>().unwrap_or_default();
    if let Command::Recommend {
        include_busy,
        no_fallback,
        ..
    } = command
    {
        if *include_busy {
            config.candidate_scope = CandidateScope::All;
        }
        config.fallback_recommendations = !*no_fallback;
    }

    let Some(path) = &args.fixture else {
        return CamaraderieClient::connect(config).await;
    };

    info!("[CLI] 📂 使用离线 fixture: {}", path.display());
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("读取 fixture 失败: {}", path.display()))?;
    let fixture: serde_json::Value = serde_json::from_str(&raw).context("fixture 不是合法 JSON")?;
    let platform = Arc::new(MemoryPlatform::from_fixture(fixture)?);
    let pool = create_sqlite_pool_with_migration(&config.storage_db_url).await?;
    Ok(CamaraderieClient::with_platform(
        config,
        platform,
        LocalStore::new(pool),
        Arc::new(EmptySessionListener),
    ))
}

/// 未指定时使用当前登录用户
fn resolve_user(client: &CamaraderieClient, explicit: &Option<String>) -> Result<String> {
    if let Some(id) = explicit {
        return Ok(id.clone());
    }
    client
        .auth
        .snapshot()
        .user
        .as_ref()
        .map(|u| u.id.clone())
        .context("未登录，请通过参数指定用户 ID")
}

fn print_score(raw: &str, ignored_hints: u32) -> Result<()> {
    let scores: SessionScores = serde_json::from_str(raw).context("解析评分 JSON 失败")?;
    let overall = overall_score(&scores);
    println!("overall score:    {}", overall);
    println!("coaching tier:    {}", coaching_tier(overall));
    println!("visibility boost: {:.1}x", visibility_boost(overall));
    println!("warning level:    {:?}", warning_level(ignored_hints));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level)?;

    // 评分是纯计算，不需要连接平台
    if let Command::Score {
        scores,
        ignored_hints,
    } = &args.command
    {
        return print_score(scores, *ignored_hints);
    }

    info!("[CLI] 🚀 Camaraderie CLI 客户端");
    let client = build_client(&args, &args.command).await?;
    let state = client.init().await;
    match &state.user {
        Some(user) => info!("[CLI] ✅ 当前用户: {} ({})", user.name(), user.id),
        None => warn!("[CLI] 未登录，以访客身份浏览"),
    }

    match &args.command {
        Command::Browse {
            gender,
            country,
            language,
            ethnicity,
            category,
            goal,
            search,
        } => {
            let filter = BroadcasterFilter::new()
                .gender(gender)
                .country(country)
                .languages(language)
                .ethnicity(ethnicity)
                .categories(category)
                .goal(goal)
                .search(search);
            let list = client.discovery.broadcasters(&filter).await;
            println!("{} ({})", client.language.t("nav.discover"), list.len());
            if list.is_empty() {
                println!("  {}", client.language.t("filter.no_results"));
            }
            for b in &list {
                println!(
                    "  {:<24} {:<10} {:<4} rating {:.1}",
                    b.name(),
                    b.status.as_str(),
                    b.country,
                    b.rating
                );
            }
        }
        Command::Recommend { viewer, .. } => {
            let viewer = resolve_user(&client, viewer)?;
            let result = client.recommendations.recommend(&viewer).await;
            println!(
                "{} ({:?})",
                client.language.t("recommend.title"),
                result.source
            );
            for b in &result.broadcasters {
                println!(
                    "  {:<24} {:>3}  {}",
                    b.name(),
                    result.scores.get(&b.id).copied().unwrap_or_default(),
                    result.reason_for(&b.id).unwrap_or_default()
                );
            }
        }
        Command::Journey { viewer } => {
            let viewer = resolve_user(&client, viewer)?;
            let (stats, milestones) = client.journey(&viewer).await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            for m in &milestones {
                let mark = if m.achieved { "✓" } else { " " };
                println!("  [{}] {:<24} {:>5.1}%", mark, m.title, m.progress);
            }
        }
        Command::Warnings { user } => {
            let user = resolve_user(&client, user)?;
            let fresh = client.warnings.poll(&user).await;
            if fresh.is_empty() {
                println!("no new warnings");
            }
            for n in &fresh {
                println!("  ⚠️ {}", n.message);
            }
        }
        Command::Score { .. } => {}
    }

    info!("[CLI] 👋 程序退出");
    Ok(())
}
