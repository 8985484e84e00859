use anyhow::Context;
use colored::Colorize;
use sakuraform_cloud::{FailureKind, ProvisionError};
use serde::de::DeserializeOwned;
use std::path::Path;

/// リソース定義ファイル (YAML) を読み込む
pub fn read_resource_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("ファイルを読み込めません: {}", path.display()))?;
    let value = serde_yaml::from_str(&content)
        .with_context(|| format!("ファイルの形式が正しくありません: {}", path.display()))?;

    println!("📄 {}", path.display().to_string().cyan());
    Ok(value)
}

/// 失敗理由に応じたヒントを表示
pub fn print_failure_hint(err: &ProvisionError) {
    let hint = match err.kind() {
        FailureKind::Cancelled => "操作は中断されました。リソースが途中の状態で残っている可能性があります",
        FailureKind::DeadlineExceeded => {
            "タイムアウトしました。sakuraform.yaml の timeouts を見直してください"
        }
        FailureKind::RemoteTerminal => "リソースが失敗状態です。コントロールパネルで確認してください",
        FailureKind::ErrorBudgetExceeded => "API エラーが続いたため待機を打ち切りました",
        FailureKind::Api => return,
    };
    eprintln!("  {} {}", "⚠".yellow(), hint);
}

/// 操作の失敗を表示して anyhow のエラーに変換
pub fn report(err: ProvisionError) -> anyhow::Error {
    eprintln!("{} {}", "✗".red().bold(), err.to_string().red());
    print_failure_hint(&err);
    anyhow::Error::new(err)
}
