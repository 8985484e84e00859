use crate::InternetCommands;
use crate::app::App;
use crate::utils;
use colored::Colorize;
use sakuraform_cloud::{ResourceKind, ResourceState, StateFile};

pub async fn handle(app: &App, cmd: InternetCommands) -> anyhow::Result<()> {
    app.print_context();
    match cmd {
        InternetCommands::Bandwidth { internet_id, mbps } => {
            bandwidth(app, &internet_id, mbps).await
        }
        InternetCommands::Delete { internet_id } => delete(app, &internet_id).await,
    }
}

async fn bandwidth(app: &App, internet_id: &str, mbps: u32) -> anyhow::Result<()> {
    println!();
    println!(
        "{}",
        format!("■ Internet[{}] の帯域を {} Mbps に変更中...", internet_id, mbps)
            .yellow()
            .bold()
    );

    let record = app
        .internet()?
        .update_bandwidth(internet_id, mbps)
        .await
        .map_err(utils::report)?;

    app.state
        .update(|s| {
            s.remove(ResourceKind::Internet, internet_id);
            s.upsert(ResourceState::from_internet(&record));
            reparent(s, internet_id, &record.id);
        })
        .await?;

    println!("  ✓ 変更完了");
    if record.id != internet_id {
        println!(
            "  {} ルータ ID が {} に変わりました",
            "⚠".yellow(),
            record.id.cyan()
        );
    }
    println!("  帯域:     {} Mbps", record.band_width_mbps);
    Ok(())
}

async fn delete(app: &App, internet_id: &str) -> anyhow::Result<()> {
    let state = app.state.load().await?;
    let children: Vec<_> = state
        .children_of(internet_id)
        .map(|c| c.id.clone())
        .collect();
    if !children.is_empty() {
        println!(
            "  {} 記録済みのサブネットが残っています: {}",
            "⚠".yellow(),
            children.join(", ")
        );
    }

    println!();
    println!(
        "{}",
        format!("■ Internet[{}] を削除中...", internet_id)
            .yellow()
            .bold()
    );

    app.internet()?
        .delete_internet(internet_id)
        .await
        .map_err(utils::report)?;

    app.state
        .update(|s| {
            s.remove(ResourceKind::Internet, internet_id);
            for child in &children {
                s.remove(ResourceKind::Subnet, child);
            }
        })
        .await?;

    println!("  ✓ 削除完了");
    Ok(())
}

/// 置き換えられたルータのサブネットを新しい ID に付け替える
fn reparent(state: &mut StateFile, old_id: &str, new_id: &str) {
    if old_id == new_id {
        return;
    }
    for resource in state.resources.values_mut() {
        if resource.kind == ResourceKind::Subnet && resource.parent_id.as_deref() == Some(old_id) {
            resource.parent_id = Some(new_id.to_string());
        }
    }
}
