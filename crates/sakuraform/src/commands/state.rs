use crate::app::App;
use colored::Colorize;
use sakuraform_cloud::{ResourceKind, ResourceStatus};

pub async fn handle_list(app: &App) -> anyhow::Result<()> {
    app.print_context();
    let state = app.state.load().await?;

    if state.resources.is_empty() {
        println!("{}", "記録済みのリソースはありません".dimmed());
        return Ok(());
    }

    for kind in [ResourceKind::Nosql, ResourceKind::Internet, ResourceKind::Subnet] {
        let resources: Vec<_> = state.of_kind(kind).collect();
        if resources.is_empty() {
            continue;
        }

        println!();
        println!("{}", format!("{} ({} 個):", kind, resources.len()).bold());
        for resource in resources {
            let status = match resource.status {
                ResourceStatus::Ready => resource.status.to_string().green(),
                ResourceStatus::Stopped => resource.status.to_string().yellow(),
                ResourceStatus::Failed => resource.status.to_string().red(),
                ResourceStatus::Unknown => resource.status.to_string().dimmed(),
            };
            let parent = resource
                .parent_id
                .as_deref()
                .map(|p| format!(" ← {}", p))
                .unwrap_or_default();
            println!(
                "  • {} [{}] {}{}",
                resource.name.cyan(),
                resource.id,
                status,
                parent.dimmed()
            );
        }
    }

    println!();
    println!(
        "最終更新: {}",
        state.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}
