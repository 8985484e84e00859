use crate::SubnetCommands;
use crate::app::App;
use crate::commands::nosql::recorded;
use crate::utils;
use colored::Colorize;
use sakuraform_cloud::model::{SubnetRecord, SubnetSpec, SubnetUpdate};
use sakuraform_cloud::{ResourceKind, ResourceState};
use serde::Deserialize;
use std::path::Path;

/// サブネット定義ファイル
#[derive(Debug, Deserialize)]
struct SubnetFile {
    internet_id: String,
    netmask: u8,
    next_hop: String,
}

pub async fn handle(app: &App, cmd: SubnetCommands) -> anyhow::Result<()> {
    app.print_context();
    match cmd {
        SubnetCommands::Create { file } => create(app, &file).await,
        SubnetCommands::Update { name, next_hop } => update(app, &name, next_hop).await,
        SubnetCommands::Delete { name } => delete(app, &name).await,
    }
}

async fn create(app: &App, file: &Path) -> anyhow::Result<()> {
    let def: SubnetFile = utils::read_resource_file(file)?;
    let spec = SubnetSpec {
        netmask: def.netmask,
        next_hop: def.next_hop,
    };

    println!();
    println!(
        "{}",
        format!("■ Internet[{}] に /{} のサブネットを追加中...", def.internet_id, spec.netmask)
            .yellow()
            .bold()
    );

    let record = app
        .internet()?
        .create_subnet(&def.internet_id, &spec)
        .await
        .map_err(utils::report)?;

    app.state
        .update(|s| s.upsert(ResourceState::from_subnet(&record)))
        .await?;

    println!("  ✓ 追加完了");
    print_subnet(&record);
    Ok(())
}

async fn update(app: &App, name: &str, next_hop: String) -> anyhow::Result<()> {
    let recorded = recorded(app, ResourceKind::Subnet, name).await?;
    let internet_id = parent_of(&recorded)?;

    println!();
    println!(
        "{}",
        format!("■ Subnet[{}] のネクストホップを {} に変更中...", name, next_hop)
            .yellow()
            .bold()
    );

    let record = app
        .internet()?
        .update_subnet(&internet_id, &recorded.id, &SubnetUpdate { next_hop })
        .await
        .map_err(utils::report)?;

    app.state
        .update(|s| s.upsert(ResourceState::from_subnet(&record)))
        .await?;

    println!("  ✓ 変更完了");
    print_subnet(&record);
    Ok(())
}

async fn delete(app: &App, name: &str) -> anyhow::Result<()> {
    let recorded = recorded(app, ResourceKind::Subnet, name).await?;
    let internet_id = parent_of(&recorded)?;

    println!();
    println!("{}", format!("■ Subnet[{}] を削除中...", name).yellow().bold());

    app.internet()?
        .delete_subnet(&internet_id, &recorded.id)
        .await
        .map_err(utils::report)?;

    app.state
        .update(|s| {
            s.remove(ResourceKind::Subnet, name);
        })
        .await?;

    println!("  ✓ 削除完了");
    Ok(())
}

fn parent_of(resource: &ResourceState) -> anyhow::Result<String> {
    resource
        .parent_id
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Subnet[{}] の親ルータが記録されていません", resource.id))
}

fn print_subnet(record: &SubnetRecord) {
    println!();
    println!("  ID:           {}", record.id.cyan());
    println!("  ルータ:       {}", record.internet_id);
    println!(
        "  ネットワーク: {}/{}",
        record.network_address, record.netmask
    );
    if let Some(next_hop) = &record.next_hop {
        println!("  ネクストホップ: {}", next_hop);
    }
    if !record.ip_addresses.is_empty() {
        println!("  IP アドレス:  {}", record.ip_addresses.join(", "));
    }
}
