//! Task list demo binary
//!
//! Drives the view-model over an in-memory service with a scripted session.

use anyhow::Context;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tasklist::{
    AccessoryType, InMemoryTaskService, SectionsStream, Task, TaskCell, TaskListViewModel,
    TaskSection, TaskService,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Task List Example ===\n");

    let service = Arc::new(InMemoryTaskService::with_tasks(vec![
        Task::new("Buy milk"),
        Task::new("Walk the dog").with_memo("Before 9am"),
        Task::new("Write report"),
    ]));
    let view_model = TaskListViewModel::new(service.clone());
    let mut sections = view_model.sections_stream();
    let mut edit_requests = view_model.present_task_edit();

    println!(">>> View did load");
    view_model.view_did_load().await?.wait().await;
    print_sections(&view_model.sections().await);

    println!("\n>>> Service creates \"Call mom\"");
    service.create_task(Task::new("Call mom")).await?;
    let snapshot = wait_for(&mut sections, |items| items.len() == 4).await?;
    print_sections(&snapshot);

    println!("\n>>> Select row 1");
    view_model.item_did_select(1).await?.wait().await;
    print_sections(&view_model.sections().await);

    println!("\n>>> Move row 0 to row 3");
    view_model.item_did_move(0, 3).await?;
    print_sections(&view_model.sections().await);

    println!("\n>>> Delete row 0");
    view_model.item_did_delete(0).await?.wait().await;
    print_sections(&view_model.sections().await);

    println!("\n>>> Tap add");
    view_model.add_button_item_did_tap().await?.wait().await;
    let request = edit_requests
        .next()
        .await
        .context("present-edit stream closed")?;
    println!("Present edit: {request:?}");

    println!("\n>>> Tap edit, then select row 0");
    view_model.edit_button_item_did_tap().await?;
    view_model.item_did_select(0).await?.wait().await;
    let request = edit_requests
        .next()
        .await
        .context("present-edit stream closed")?;
    println!("Present edit for \"{}\"", request.task().title);

    println!("\n>>> Stored tasks");
    for task in service.tasks().await {
        println!("  {} (done: {})", task.title, task.is_done);
    }

    view_model.shutdown().await?;
    println!("\n=== Done ===");
    Ok(())
}

/// Waits for a snapshot whose single section satisfies `predicate`
async fn wait_for<F>(
    sections: &mut SectionsStream,
    predicate: F,
) -> anyhow::Result<Vec<TaskSection>>
where
    F: Fn(&[TaskCell]) -> bool,
{
    tokio::time::timeout(SETTLE_TIMEOUT, async {
        while let Some(snapshot) = sections.next().await {
            if snapshot.first().is_some_and(|section| predicate(&section.items)) {
                return Some(snapshot);
            }
        }
        None
    })
    .await
    .context("timed out waiting for task list")?
    .context("sections stream closed")
}

fn print_sections(sections: &[TaskSection]) {
    for section in sections {
        for (index, cell) in section.items.iter().enumerate() {
            let mark = match cell.accessory {
                AccessoryType::Checkmark => "x",
                AccessoryType::None => " ",
            };
            println!("  {index}. [{mark}] {}", cell.title);
        }
    }
}
