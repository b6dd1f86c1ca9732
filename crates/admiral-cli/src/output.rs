//! Output formatting for CLI commands.
//!
//! Listings render as aligned tables, or as JSON with `--json`.

use std::io::{self, Write};
use std::sync::Arc;

use admiral_client::track::{print_task_id, TaskNotifier};
use admiral_client::TrackMode;
use admiral_core::{Application, Container, Host, Network, TaskStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Trait for values that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table. `now` anchors relative times.
    fn write_table(&self, writer: &mut dyn Write, now: DateTime<Utc>) -> io::Result<()>;
}

/// Stream that progress notices go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeStream {
    Stdout,
    Stderr,
}

/// Output formatter handling both table and JSON output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    json: bool,
}

impl Output {
    /// Create a new output formatter.
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Check if JSON output is selected.
    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Stream for notices printed while a command runs. With JSON output
    /// stdout carries the document only.
    pub fn notice_stream(&self) -> NoticeStream {
        if self.json {
            NoticeStream::Stderr
        } else {
            NoticeStream::Stdout
        }
    }

    /// Notifier announcing tracked task IDs on the notice stream.
    pub fn task_notifier(&self) -> TaskNotifier {
        match self.notice_stream() {
            NoticeStream::Stdout => print_task_id(),
            NoticeStream::Stderr => Arc::new(|id: &str| eprintln!("Task ID: {}", id)),
        }
    }

    /// Write a value as a table or as JSON.
    pub fn write<W, T>(&self, writer: &mut W, value: &T, now: DateTime<Utc>) -> io::Result<()>
    where
        W: Write,
        T: Serialize + TableDisplay + ?Sized,
    {
        if self.json {
            write_json(writer, value)
        } else {
            value.write_table(writer, now)
        }
    }

    /// Report the IDs an operation produced.
    ///
    /// `done` is printed once the task finished, `pending` when it was
    /// detached and may still be running.
    pub fn write_outcome<W: Write>(
        &self,
        writer: &mut W,
        mode: TrackMode,
        done: &str,
        pending: &str,
        ids: &[String],
    ) -> io::Result<()> {
        if self.json {
            return write_json(writer, ids);
        }
        let label = match mode {
            TrackMode::Wait => done,
            TrackMode::Detach => pending,
        };
        if ids.is_empty() {
            writeln!(writer, "{}", label)
        } else {
            writeln!(writer, "{}: {}", label, ids.join(" "))
        }
    }
}

/// Write pretty-printed JSON followed by a newline.
pub fn write_json<W, T>(writer: &mut W, value: &T) -> io::Result<()>
where
    W: Write,
    T: Serialize + ?Sized,
{
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

impl TableDisplay for [Container] {
    fn write_table(&self, writer: &mut dyn Write, now: DateTime<Utc>) -> io::Result<()> {
        writeln!(
            writer,
            "{:<16}  {:<24}  {:<18}  {:<20}  {:<16}  {:<14}  {}",
            "ID", "NAME", "ADDRESS", "STATUS", "CREATED", "PORTS", "EXTERNAL ID"
        )?;
        for container in self {
            writeln!(
                writer,
                "{:<16}  {:<24}  {:<18}  {:<20}  {:<16}  {:<14}  {}",
                container.id(),
                or_dash(container.name()),
                or_dash(container.address.as_deref().unwrap_or("")),
                container.status(now),
                container.created_ago(now),
                container.ports_summary(),
                or_dash(container.external_id()),
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for [Application] {
    fn write_table(&self, writer: &mut dyn Write, _now: DateTime<Utc>) -> io::Result<()> {
        writeln!(
            writer,
            "{:<36}  {:<24}  {:<10}  {}",
            "ID", "NAME", "CONTAINERS", "NETWORKS"
        )?;
        for app in self {
            writeln!(
                writer,
                "{:<36}  {:<24}  {:<10}  {}",
                app.id(),
                or_dash(&app.name),
                app.container_links().count(),
                app.network_links().count(),
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for [Host] {
    fn write_table(&self, writer: &mut dyn Write, _now: DateTime<Utc>) -> io::Result<()> {
        writeln!(
            writer,
            "{:<36}  {:<24}  {:<28}  {:<8}  {:<10}  {}",
            "ID", "NAME", "ADDRESS", "STATE", "CONTAINERS", "PLACEMENT ZONE"
        )?;
        for host in self {
            writeln!(
                writer,
                "{:<36}  {:<24}  {:<28}  {:<8}  {:<10}  {}",
                host.id(),
                or_dash(host.display_name()),
                or_dash(&host.address),
                host.power_state.as_deref().unwrap_or("UNKNOWN"),
                host.containers_count(),
                or_dash(host.placement_zone_id()),
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for [Network] {
    fn write_table(&self, writer: &mut dyn Write, _now: DateTime<Utc>) -> io::Result<()> {
        writeln!(
            writer,
            "{:<36}  {:<24}  {:<10}  {:<10}  {}",
            "ID", "NAME", "DRIVER", "STATE", "CONTAINERS"
        )?;
        for network in self {
            writeln!(
                writer,
                "{:<36}  {:<24}  {:<10}  {:<10}  {}",
                network.id(),
                or_dash(&network.name),
                network.driver.as_deref().unwrap_or("-"),
                network.power_state.as_deref().unwrap_or("UNKNOWN"),
                network.connected_containers_count.unwrap_or(0),
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for TaskStatus {
    fn write_table(&self, writer: &mut dyn Write, _now: DateTime<Utc>) -> io::Result<()> {
        writeln!(writer, "  Task ID:    {}", admiral_core::short_id(&self.document_self_link))?;
        if let Some(name) = &self.name {
            writeln!(writer, "  Name:       {}", name)?;
        }
        writeln!(writer, "  Stage:      {}", self.phase())?;
        if let Some(sub_stage) = &self.sub_stage {
            writeln!(writer, "  Sub-stage:  {}", sub_stage)?;
        }
        if let Some(progress) = self.progress {
            writeln!(writer, "  Progress:   {}%", progress)?;
        }
        let ids = self.resource_ids();
        if !ids.is_empty() {
            writeln!(writer, "  Resources:  {}", ids.join(", "))?;
        }
        if let Some(message) = self.failure_message() {
            writeln!(writer, "  Failure:    {}", message)?;
        }
        Ok(())
    }
}
