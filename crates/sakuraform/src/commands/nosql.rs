use crate::NosqlCommands;
use crate::app::App;
use crate::utils;
use colored::Colorize;
use sakuraform_cloud::model::{
    AddNodesSpec, ApplianceSpec, ApplianceUpdate, RemoteApplianceState,
};
use sakuraform_cloud::{ResourceKind, ResourceState};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// NoSQL リソース定義ファイル
///
/// ```yaml
/// name: db01
/// plan: nosql-3
/// zone: tk1b
/// body:
///   Settings: { ... }
/// parameters:
///   concurrent_compactors: "4"
/// ```
#[derive(Debug, Deserialize)]
struct NosqlFile {
    name: String,
    plan: String,
    #[serde(default)]
    zone: Option<String>,
    #[serde(default)]
    body: serde_json::Value,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct AddNodesFile {
    #[serde(default)]
    zone: Option<String>,
    #[serde(default)]
    body: serde_json::Value,
}

/// 追加ノードの状態ファイル上の名前
fn nodes_name(primary: &str) -> String {
    format!("{}-nodes", primary)
}

pub async fn handle(app: &App, cmd: NosqlCommands) -> anyhow::Result<()> {
    app.print_context();
    match cmd {
        NosqlCommands::Create { file } => create(app, &file).await,
        NosqlCommands::Update { name, file } => update(app, &name, &file).await,
        NosqlCommands::Delete { name } => delete(app, &name).await,
        NosqlCommands::AddNodes { primary, file } => add_nodes(app, &primary, &file).await,
        NosqlCommands::Read { name } => read(app, &name).await,
    }
}

async fn create(app: &App, file: &Path) -> anyhow::Result<()> {
    let def: NosqlFile = utils::read_resource_file(file)?;

    let state = app.state.load().await?;
    if let Some(existing) = state.get(ResourceKind::Nosql, &def.name) {
        anyhow::bail!(
            "'{}' は既に作成済みです (ID: {})。変更は nosql update を使ってください",
            def.name,
            existing.id
        );
    }

    let spec = ApplianceSpec {
        zone: def.zone.unwrap_or_else(|| app.settings.zone.clone()),
        name: def.name,
        plan: def.plan,
        body: def.body,
        parameters: def.parameters,
    };

    println!();
    println!(
        "{}",
        format!("■ {} を作成中... (利用可能になるまで待機します)", spec.name)
            .yellow()
            .bold()
    );

    let remote = app.nosql()?.create(&spec).await.map_err(utils::report)?;

    app.state
        .update(|s| s.upsert(ResourceState::from_appliance(&remote, &spec.parameters)))
        .await?;

    println!("  ✓ 作成完了");
    print_appliance(&remote);
    Ok(())
}

async fn update(app: &App, name: &str, file: &Path) -> anyhow::Result<()> {
    let change: ApplianceUpdate = utils::read_resource_file(file)?;
    let recorded = recorded(app, ResourceKind::Nosql, name).await?;
    if let Some(primary) = &recorded.parent_id {
        anyhow::bail!(
            "'{}' は追加ノードのため更新できません (プライマリ ID: {})",
            name,
            primary
        );
    }

    println!();
    println!("{}", format!("■ {} を更新中...", name).yellow().bold());

    let remote = app
        .nosql()?
        .update(&recorded.id, &change, &recorded.parameters)
        .await
        .map_err(utils::report)?;

    // 空の parameters は「変更なし」
    let parameters = if change.parameters.is_empty() {
        recorded.parameters.clone()
    } else {
        change.parameters.clone()
    };
    let mut resource = ResourceState::from_appliance(&remote, &parameters);
    resource.name = name.to_string();
    app.state.update(|s| s.upsert(resource)).await?;

    println!("  ✓ 更新完了");
    print_appliance(&remote);
    Ok(())
}

async fn delete(app: &App, name: &str) -> anyhow::Result<()> {
    let recorded = recorded(app, ResourceKind::Nosql, name).await?;

    println!();
    println!(
        "{}",
        format!("■ {} を停止して削除中...", name).yellow().bold()
    );

    app.nosql()?
        .delete(&recorded.id)
        .await
        .map_err(utils::report)?;

    app.state
        .update(|s| {
            s.remove(ResourceKind::Nosql, name);
        })
        .await?;

    println!("  ✓ 削除完了");
    Ok(())
}

async fn add_nodes(app: &App, primary: &str, file: &Path) -> anyhow::Result<()> {
    let def: AddNodesFile = utils::read_resource_file(file)?;
    let recorded = recorded(app, ResourceKind::Nosql, primary).await?;

    // 既存の記録を上書きすると追加ノードの ID を見失う
    let name = nodes_name(primary);
    let state = app.state.load().await?;
    if let Some(existing) = state.get(ResourceKind::Nosql, &name) {
        anyhow::bail!(
            "'{}' は既に作成済みです (ID: {})。先に nosql delete {} で削除してください",
            name,
            existing.id,
            name
        );
    }

    let spec = AddNodesSpec {
        zone: def.zone.unwrap_or_else(|| app.settings.zone.clone()),
        body: def.body,
    };

    println!();
    println!(
        "{}",
        format!("■ {} にノードを追加中...", primary).yellow().bold()
    );

    let remote = app
        .nosql()?
        .add_nodes(&recorded.id, &spec)
        .await
        .map_err(utils::report)?;

    let mut resource = ResourceState::from_appliance(&remote, &BTreeMap::new());
    resource.name = name;
    resource.parent_id = Some(recorded.id.clone());
    app.state.update(|s| s.upsert(resource)).await?;

    println!("  ✓ 追加完了");
    print_appliance(&remote);
    Ok(())
}

async fn read(app: &App, name: &str) -> anyhow::Result<()> {
    let recorded = recorded(app, ResourceKind::Nosql, name).await?;

    match app
        .nosql()?
        .read(&recorded.id)
        .await
        .map_err(utils::report)?
    {
        Some(remote) => {
            let mut resource = ResourceState::from_appliance(&remote, &recorded.parameters);
            resource.name = name.to_string();
            resource.parent_id = recorded.parent_id.clone();
            app.state.update(|s| s.upsert(resource)).await?;
            print_appliance(&remote);
        }
        None => {
            // リモートで削除済みなら記録からも外す
            app.state
                .update(|s| {
                    s.remove(ResourceKind::Nosql, name);
                })
                .await?;
            println!(
                "  {} {} (ID: {}) は存在しません。記録を削除しました",
                "⚠".yellow(),
                name,
                recorded.id
            );
        }
    }
    Ok(())
}

/// 状態ファイルから記録済みのリソースを取り出す
pub(crate) async fn recorded(
    app: &App,
    kind: ResourceKind,
    name: &str,
) -> anyhow::Result<ResourceState> {
    let state = app.state.load().await?;
    state.get(kind, name).cloned().ok_or_else(|| {
        anyhow::anyhow!(
            "{} '{}' は記録されていません。sakuraform state list で確認してください",
            kind,
            name
        )
    })
}

fn print_appliance(remote: &RemoteApplianceState) {
    println!();
    println!("  名前:     {}", remote.name.cyan());
    println!("  ID:       {}", remote.id);
    if let Some(zone) = &remote.zone {
        println!("  ゾーン:   {}", zone);
    }
    println!(
        "  状態:     {} / {} / {}",
        remote.availability, remote.instance_status, remote.health_status
    );
}
