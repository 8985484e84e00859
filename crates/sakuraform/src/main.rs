mod app;
mod commands;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sakuraform")]
#[command(about = "さくらのクラウドのリソースを、待たずに確実に。", long_about = None)]
struct Cli {
    /// ログを詳細に出力 (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// ゾーン (設定ファイルの zone を上書き)
    #[arg(long, env = "SAKURAFORM_ZONE", global = true)]
    zone: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// NoSQL アプライアンスを操作
    #[command(subcommand)]
    Nosql(NosqlCommands),
    /// インターネット接続のサブネットを操作
    #[command(subcommand)]
    Subnet(SubnetCommands),
    /// インターネット接続 (ルータ) を操作
    #[command(subcommand)]
    Internet(InternetCommands),
    /// 記録済みのリソースを表示
    #[command(subcommand)]
    State(StateCommands),
    /// バージョン情報を表示
    Version,
}

#[derive(Subcommand)]
pub enum NosqlCommands {
    /// 作成して利用可能になるまで待つ
    Create {
        /// リソース定義ファイル (YAML)
        file: PathBuf,
    },
    /// 設定を変更して反映を待つ
    Update {
        /// 記録済みのリソース名
        name: String,
        /// 変更内容ファイル (YAML)
        file: PathBuf,
    },
    /// 停止してから削除
    Delete {
        /// 記録済みのリソース名
        name: String,
    },
    /// 追加ノードを作成
    AddNodes {
        /// プライマリのリソース名
        primary: String,
        /// 追加ノード定義ファイル (YAML)
        file: PathBuf,
    },
    /// 現在の状態を取得
    Read {
        /// 記録済みのリソース名
        name: String,
    },
}

#[derive(Subcommand)]
pub enum SubnetCommands {
    /// サブネットを追加
    Create {
        /// サブネット定義ファイル (YAML)
        file: PathBuf,
    },
    /// ネクストホップを変更
    Update {
        /// サブネット ID
        name: String,
        /// 新しいネクストホップ
        #[arg(long)]
        next_hop: String,
    },
    /// サブネットを削除
    Delete {
        /// サブネット ID
        name: String,
    },
}

#[derive(Subcommand)]
pub enum InternetCommands {
    /// 帯域を変更 (ルータ ID が変わります)
    Bandwidth {
        /// ルータ ID
        internet_id: String,
        /// 帯域 (Mbps)
        mbps: u32,
    },
    /// ルータを削除
    Delete {
        /// ルータ ID
        internet_id: String,
    },
}

#[derive(Subcommand)]
pub enum StateCommands {
    /// 記録済みのリソース一覧
    List,
}

fn init_tracing(verbose: u8) {
    // RUST_LOG が指定されていればそちらを優先
    let default = match verbose {
        0 => "warn,sakuraform_cloud=info",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("sakuraform {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let app = app::App::load(cli.zone)?;

    // Ctrl-C で実行中の操作をキャンセル
    {
        let cancel = app.cancel_token().clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{}", "中断しています...".yellow());
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Nosql(cmd) => commands::nosql::handle(&app, cmd).await,
        Commands::Subnet(cmd) => commands::subnet::handle(&app, cmd).await,
        Commands::Internet(cmd) => commands::internet::handle(&app, cmd).await,
        Commands::State(StateCommands::List) => commands::state::handle_list(&app).await,
        Commands::Version => Ok(()),
    }
}
