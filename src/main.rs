//! `knnloc` — 在指纹数据集上训练并评估 kNN 定位模型
//!
//! 读取 `<dataset>/train` 与查询分区（默认 `test`）的 RSSI 宽表，
//! 训练模型、预测坐标，并输出定位误差统计。
//!
//! ```bash
//! # 默认配置：k = 33，卡尔曼滤波层 Q = 0.04, R = 4.0
//! knnloc --dataset data/dataset1
//!
//! # 使用配置文件并以 JSON 输出报告
//! knnloc --dataset data/dataset1 --config knn.json --json
//! ```

use clap::Parser;
use knnloc::algorithms::{EvaluationReport, RegressionModel};
use knnloc::config::{LayerConfig, LocalizerConfig};
use knnloc::dataset::{load_partition, ContainerKind, Partition};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(
    name = "knnloc",
    version,
    about = "RSSI fingerprint kNN localization: train, predict and report position error",
    long_about = None,
)]
struct Args {
    /// 数据集根目录（包含 train/test/valid 子目录）
    #[arg(long)]
    dataset: PathBuf,

    /// 模型配置文件（JSON），缺省时使用 k = 33 + 卡尔曼滤波层
    #[arg(long)]
    config: Option<PathBuf>,

    /// 覆盖配置中的近邻数
    #[arg(long)]
    k: Option<usize>,

    /// 用于评估的分区
    #[arg(long, default_value = "test")]
    partition: Partition,

    /// 训练与预测之间重置预处理层状态
    #[arg(long, default_value_t = false)]
    reset_between: bool,

    /// 以 JSON 输出报告
    #[arg(long, default_value_t = false)]
    json: bool,

    /// 日志级别: trace, debug, info, warn, error（RUST_LOG 优先）
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// 原始评估脚本使用的配置
fn default_config() -> LocalizerConfig {
    LocalizerConfig {
        k: 33,
        layers: vec![LayerConfig::KalmanFilter { q: 0.04, r: 4.0 }],
        ..Default::default()
    }
}

fn run(args: &Args) -> Result<EvaluationReport, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => LocalizerConfig::from_path(path)?,
        None => default_config(),
    };
    if let Some(k) = args.k {
        config.k = k;
    }
    let mut model = config.build()?;

    let train = load_partition(&args.dataset, Partition::Train, &[ContainerKind::Rssi])?;
    let query = load_partition(&args.dataset, args.partition, &[ContainerKind::Rssi])?;
    let (train, query) = match (train.get(&ContainerKind::Rssi), query.get(&ContainerKind::Rssi)) {
        (Some(train), Some(query)) => (train, query),
        _ => return Err("RSSI 数据未加载".into()),
    };

    let train_x = train.x()?;
    let train_y = train.y()?.ok_or("训练集缺少坐标标签")?;
    let query_x = query.x()?;
    let query_y = query.y()?.ok_or("评估集缺少坐标标签")?;
    tracing::info!(
        train = train_x.nrows(),
        query = query_x.nrows(),
        channels = train_x.ncols(),
        partition = %args.partition,
        "dataset loaded"
    );

    model.fit(train_x.view(), train_y.view())?;
    if args.reset_between {
        model.reset_layers();
    }
    let pred = model.predict(query_x.view())?;

    let layers = model
        .pipeline()
        .layers()
        .iter()
        .map(|l| l.name().to_string())
        .collect();
    let report = EvaluationReport::new(
        model.name(),
        model.k(),
        model.metric().name(),
        layers,
        train_x.nrows(),
        pred.view(),
        query_y.view(),
    )?;
    Ok(report)
}

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("knnloc={}", args.log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(report) if args.json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("ERROR: {e}");
                std::process::exit(1);
            }
        },
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    }
}
