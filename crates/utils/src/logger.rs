use std::fs;
use time::format_description::well_known::Rfc3339;
use time::macros::offset;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::{FilterFn, LevelFilter};
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// 策略执行日志的 target (引擎生命周期、套利对处理、试探结果)
pub const TARGET_STRATEGY: &str = "strategy";
/// 链上交易日志的 target (授权、提交、确认)
pub const TARGET_TRADE: &str = "trade_executor";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 按 target 分流的日志文件
struct LogFile {
    name: &'static str,
    level: LevelFilter,
    accepts: fn(&str) -> bool,
}

const LOG_FILES: [LogFile; 3] = [
    // 通用日志，排除专用 target
    LogFile {
        name: "app.log",
        level: LevelFilter::INFO,
        accepts: is_app_target,
    },
    // 包含 DEBUG 级别的试探明细
    LogFile {
        name: "strategy.log",
        level: LevelFilter::DEBUG,
        accepts: is_strategy_target,
    },
    LogFile {
        name: "trade.log",
        level: LevelFilter::TRACE,
        accepts: is_trade_target,
    },
];

fn is_app_target(target: &str) -> bool {
    !matches!(target, TARGET_STRATEGY | TARGET_TRADE)
}

fn is_strategy_target(target: &str) -> bool {
    target == TARGET_STRATEGY
}

fn is_trade_target(target: &str) -> bool {
    target == TARGET_TRADE
}

/// 东八区时间戳
fn shanghai_timer() -> OffsetTime<Rfc3339> {
    OffsetTime::new(offset!(+8), Rfc3339)
}

/// 日志管理器，持有后台写线程的 guard，需在进程生命周期内保留
pub struct LoggerManager {
    _guards: Vec<non_blocking::WorkerGuard>,
}

impl LoggerManager {
    /// 初始化日志系统
    ///
    /// 控制台级别由 `level` (RUST_LOG 语法) 决定；
    /// `dir` 下按天滚动 app.log / strategy.log / trade.log
    pub fn init(dir: &str, level: &str) -> Self {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("创建日志目录 {} 失败: {}", dir, e);
        }

        let console_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        let mut layers: Vec<BoxedLayer> = vec![fmt::layer()
            .compact()
            .with_target(true)
            .with_timer(shanghai_timer())
            .with_filter(console_filter)
            .boxed()];

        let mut guards = Vec::with_capacity(LOG_FILES.len());
        for file in LOG_FILES {
            let (writer, guard) = non_blocking(rolling::daily(dir, file.name));
            guards.push(guard);

            let accepts = file.accepts;
            layers.push(
                fmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(shanghai_timer())
                    .with_filter(file.level)
                    .with_filter(FilterFn::new(move |metadata| accepts(metadata.target())))
                    .boxed(),
            );
        }

        if let Err(e) = tracing_subscriber::registry().with(layers).try_init() {
            eprintln!("日志系统已初始化: {}", e);
        }

        Self { _guards: guards }
    }
}
