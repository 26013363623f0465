// src/main.rs

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use angular_app_analyzer::project_analyzer::{ProjectAnalyzer, find_routing_file};

/// CLI 引数定義
#[derive(Parser, Debug)]
#[command(
    name = "Angular App Analyzer",
    version = "0.1.0",
    about = "Angular プロジェクトのルーティング・テンプレート・コンポーネントロジックを静的解析し、構造モデルを JSON 出力する CLI ツール"
)]
struct Cli {
    /// 解析対象の Angular プロジェクトルート
    /// 例: `--project-root C:/path/to/my-angular-project`
    #[arg(short = 'r', long = "project-root", value_name = "DIR")]
    project_root: PathBuf,

    /// メインルーティングファイルの明示指定
    /// (省略時はファイル名の慣習から自動検出する)
    #[arg(long = "routing-file", value_name = "FILE")]
    routing_file: Option<PathBuf>,

    /// 子コンポーネント参照とみなすタグ名の接頭辞
    #[arg(long = "component-prefix", value_name = "PREFIX", default_value = "app-")]
    component_prefix: String,

    /// 結果 JSON の出力先 (省略時は標準出力)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // ログは stderr へ。stdout は結果 JSON 専用にする
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // 1) CLI 引数をパースし、プロジェクトルートを絶対パス化
    let cli = Cli::parse();
    let project_dir = cli
        .project_root
        .canonicalize()
        .with_context(|| format!("プロジェクトルートが見つかりません: {:?}", cli.project_root))?;

    // 2) ルーティングファイルの決定 (明示指定 > 自動検出)
    let routing_file = match cli.routing_file {
        Some(path) => path,
        None => find_routing_file(&project_dir)?,
    };
    tracing::info!(file = %routing_file.display(), "メインルーティングファイル");

    // 3) プロジェクト解析の実行
    let analyzer = ProjectAnalyzer::new().with_component_prefix(cli.component_prefix);
    let result = analyzer.analyze(&project_dir, &routing_file)?;

    // 4) 構造モデルを JSON 化して出力
    let json = serde_json::to_string_pretty(&result)?;
    match cli.output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("出力に失敗しました: {path:?}"))?
        }
        None => println!("{json}"),
    }

    Ok(())
}
