//! Wiring shared by all commands

use anyhow::Context;
use colored::Colorize;
use sakuraform_cloud::{
    ApplianceOrchestrator, CancellationToken, NamedMutex, SharedParentOrchestrator, StateManager,
};
use sakuraform_cloud_sakura::{ClientConfig, InternetApi, NosqlApi, SakuraClient};
use sakuraform_config::Settings;
use std::sync::Arc;

/// コマンド 1 回分の実行環境
///
/// `locks` はこのプロセス内の操作だけを直列化する。別プロセスで同じ
/// ルータのサブネットを同時に変更した場合は直列化されない。
pub struct App {
    pub settings: Settings,
    pub state: StateManager,
    cancel: CancellationToken,
    locks: Arc<NamedMutex>,
}

impl App {
    /// 設定を読み込み、カレントディレクトリをプロジェクトルートとする
    pub fn load(zone: Option<String>) -> anyhow::Result<Self> {
        let mut settings = sakuraform_config::load_settings()?;
        if let Some(zone) = zone {
            settings.zone = zone;
        }

        let project_root = std::env::current_dir()?;
        tracing::debug!(
            "zone={} project_root={}",
            settings.zone,
            project_root.display()
        );

        Ok(Self {
            state: StateManager::new(&project_root),
            settings,
            cancel: CancellationToken::new(),
            locks: Arc::new(NamedMutex::new()),
        })
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn client(&self) -> anyhow::Result<SakuraClient> {
        let config = ClientConfig::from_env()
            .context("APIキーを環境変数に設定してください")?
            .with_zone(&self.settings.zone)
            .with_api_root_url(&self.settings.api_root_url);
        Ok(SakuraClient::new(config))
    }

    pub fn nosql(&self) -> anyhow::Result<ApplianceOrchestrator<NosqlApi>> {
        Ok(ApplianceOrchestrator::new(NosqlApi::new(self.client()?))
            .with_resource_name("NoSQL")
            .with_policies(self.settings.poll_policies())
            .with_timeouts(self.settings.operation_timeouts())
            .with_cancellation(self.cancel.clone()))
    }

    pub fn internet(&self) -> anyhow::Result<SharedParentOrchestrator<InternetApi>> {
        Ok(
            SharedParentOrchestrator::new(InternetApi::new(self.client()?), self.locks.clone())
                .with_timeouts(self.settings.operation_timeouts())
                .with_cancellation(self.cancel.clone()),
        )
    }

    pub fn print_context(&self) {
        println!(
            "ゾーン: {}  状態ファイル: {}",
            self.settings.zone.cyan(),
            self.state.state_path().display().to_string().dimmed()
        );
    }
}
