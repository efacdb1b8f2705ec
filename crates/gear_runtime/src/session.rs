//! Interactive session
//!
//! Turns commands into the pointer callbacks a windowed front end would
//! make, so every transfer goes through the same drag state machine.

use std::sync::Arc;

use gear_grid::GridLayout;
use gear_inventory::{
    DropTarget, Position, TransferError, TransferOutcome, TransferResult, ViewAdapter,
};
use gear_sync::{BatchSink, FailedBatch, PersistRecord, SyncClient};
use parking_lot::Mutex;
use tokio::runtime::Runtime;

use crate::command::{Command, HELP};
use crate::surface::TextSurface;

/// Sync client shared between the engine and the session
#[derive(Clone)]
pub struct SharedSink(pub Arc<Mutex<SyncClient>>);

impl BatchSink for SharedSink {
    fn submit(&mut self, records: Vec<PersistRecord>) {
        self.0.lock().persist(records);
    }
}

/// What a command asked of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    view: ViewAdapter<TextSurface>,
    sync: Option<Arc<Mutex<SyncClient>>>,
    failed: Vec<FailedBatch>,
}

impl Session {
    pub fn new(view: ViewAdapter<TextSurface>, sync: Option<Arc<Mutex<SyncClient>>>) -> Self {
        Self {
            view,
            sync,
            failed: Vec::new(),
        }
    }

    pub fn view(&self) -> &ViewAdapter<TextSurface> {
        &self.view
    }

    /// Writes that failed and have not been retried
    pub fn failed(&self) -> &[FailedBatch] {
        &self.failed
    }

    /// Run one command, returning the lines to print
    pub fn execute(&mut self, command: Command) -> (Flow, Vec<String>) {
        let mut out = Vec::new();

        match command {
            Command::Drag { item, target } => {
                let result = self.drag(&item, target);
                out.push(describe(&item, result));
            }
            Command::Toggle(item) => {
                let result = self.view.on_double_activate(&item);
                out.push(describe(&item, result));
            }
            Command::Rotate(orientation) => {
                let layout = self.view.engine().layout().with_orientation(orientation);
                out.extend(self.rotate(layout));
            }
            Command::Show => out.extend(self.view.surface().render()),
            Command::List => {
                for item in self.view.engine().items() {
                    out.push(format!(
                        "{:<16} {:<8} {} {}",
                        item.name,
                        format!("{:?}", item.rarity).to_lowercase(),
                        item.rarity.colour(),
                        item.current_position
                    ));
                }
                if out.is_empty() {
                    out.push("No items".to_string());
                }
            }
            Command::Retry => out.push(self.retry()),
            Command::Help => out.extend(HELP.iter().map(|line| line.to_string())),
            Command::Quit => return (Flow::Quit, out),
        }

        out.extend(self.view.surface_mut().take_messages());
        out.extend(self.collect_failures());
        (Flow::Continue, out)
    }

    /// Replay a drag as pointer events: start, leave the origin panel when
    /// the target lies in the other one, then drop.
    fn drag(&mut self, item: &str, target: DropTarget) -> TransferResult<TransferOutcome> {
        self.view.on_drag_start(item)?;

        let metrics = self.view.metrics();
        let origin = self.view.engine().locate(item).unwrap_or(Position::Unplaced);
        let exit_y = match (origin, target) {
            (Position::Slot(_), DropTarget::Slot(_)) => None,
            (Position::Slot(_), _) => Some(metrics.panel_height + metrics.cell_size),
            (_, DropTarget::Cell(_)) => None,
            (_, _) => Some(-metrics.cell_size),
        };

        let result = match exit_y {
            Some(y) => self
                .view
                .on_drag_move(item, 0.0, y)
                .and_then(|_| self.view.on_drag_end(item, target)),
            None => self.view.on_drag_end(item, target),
        };

        if result.is_err() {
            self.view.on_drag_cancel();
        }
        result
    }

    fn rotate(&mut self, layout: GridLayout) -> Vec<String> {
        let (rows, cols) = layout.shape();
        match self.view.on_resize(layout) {
            Ok(report) => {
                let mut out = vec![format!("Grid is now {}x{}", rows, cols)];
                if !report.replaced.is_empty() {
                    out.push(format!("Moved: {}", report.replaced.join(", ")));
                }
                if !report.overflow.is_empty() {
                    out.push(format!("No room for: {}", report.overflow.join(", ")));
                }
                out
            }
            Err(e) => vec![format!("Error: {}", e)],
        }
    }

    fn retry(&mut self) -> String {
        let Some(sync) = &self.sync else {
            return "Sync is disabled".to_string();
        };
        if self.failed.is_empty() {
            return "Nothing to retry".to_string();
        }

        let count = self.failed.len();
        let mut client = sync.lock();
        for failed in self.failed.drain(..) {
            client.retry(failed);
        }
        format!("Resubmitted {} batch(es)", count)
    }

    /// Move reported write failures into the retry list
    pub fn collect_failures(&mut self) -> Vec<String> {
        let Some(sync) = &self.sync else {
            return Vec::new();
        };

        let failures = sync.lock().take_failures();
        let lines = failures
            .iter()
            .map(|f| {
                format!(
                    "Write {} ({}) failed: {}",
                    f.batch.sequence,
                    f.batch.names().join(", "),
                    f.error
                )
            })
            .collect();
        self.failed.extend(failures);
        lines
    }

    /// Wait for every write in flight
    pub fn flush(&mut self, runtime: &Runtime) -> Vec<String> {
        if let Some(sync) = &self.sync {
            let mut client = sync.lock();
            runtime.block_on(client.flush());
        }
        self.collect_failures()
    }
}

fn describe(item: &str, result: Result<TransferOutcome, TransferError>) -> String {
    match result {
        Ok(TransferOutcome::Committed(records)) => {
            format!("{}: saved {} change(s)", item, records.len())
        }
        Ok(TransferOutcome::Rejected(reason)) => format!("{}: refused ({:?})", item, reason),
        Ok(TransferOutcome::Noop) => format!("{}: nothing to do", item),
        Err(e) => format!("Error: {}", e),
    }
}
