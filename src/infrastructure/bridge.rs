// Bridge - the command/signal channel between the controller and the chart view
use crate::domain::display::DisplaySeries;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Commands delivered from the controller to the rendering surface.
#[derive(Debug, Clone)]
pub enum ChartCommand {
    /// Apply fresh data to the chart, creating it on first draw.
    Update(DisplaySeries),
    /// Hide the chart and show the loading indicator.
    Loading,
    /// Tear the chart instance down entirely.
    Reset,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The view side has not signalled readiness yet, or is gone. The
    /// command was dropped.
    #[error("chart view channel is not ready or has been torn down")]
    ChannelUnavailable,
}

/// Controller half: fire-and-forget sends, in order, best-effort. Every send
/// is gated on the view's readiness signal; nothing is queued for a view
/// that has not come up yet.
#[derive(Clone)]
pub struct Bridge {
    commands: mpsc::Sender<ChartCommand>,
    ready: watch::Receiver<bool>,
}

/// View half: the command stream plus the one-shot readiness signal.
pub struct BridgeView {
    pub commands: mpsc::Receiver<ChartCommand>,
    ready: watch::Sender<bool>,
}

/// Create a connected controller/view pair.
pub fn channel(capacity: usize) -> (Bridge, BridgeView) {
    let (command_tx, command_rx) = mpsc::channel(capacity);
    let (ready_tx, ready_rx) = watch::channel(false);
    (
        Bridge {
            commands: command_tx,
            ready: ready_rx,
        },
        BridgeView {
            commands: command_rx,
            ready: ready_tx,
        },
    )
}

impl Bridge {
    pub fn send_update(&self, series: DisplaySeries) -> Result<(), BridgeError> {
        self.send(ChartCommand::Update(series))
    }

    pub fn send_loading(&self) -> Result<(), BridgeError> {
        self.send(ChartCommand::Loading)
    }

    pub fn send_reset(&self) -> Result<(), BridgeError> {
        self.send(ChartCommand::Reset)
    }

    /// Wait until the view side has signalled readiness. Fires immediately if
    /// it already has.
    pub async fn ready(&self) {
        let mut ready = self.ready.clone();
        // Only errors if the view half is gone, in which case sends fail
        // with ChannelUnavailable anyway.
        let _ = ready.wait_for(|up| *up).await;
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    fn send(&self, command: ChartCommand) -> Result<(), BridgeError> {
        if !self.is_ready() {
            return Err(BridgeError::ChannelUnavailable);
        }
        self.commands
            .try_send(command)
            .map_err(|_| BridgeError::ChannelUnavailable)
    }
}

impl BridgeView {
    /// Signal the controller that the view is consuming commands. Later
    /// calls are harmless; the signal only transitions once.
    pub fn confirm_ready(&self) {
        let _ = self.ready.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::SeriesId;

    fn series(id: &str) -> DisplaySeries {
        DisplaySeries {
            labels: vec!["00:00:00".to_string()],
            values: vec![1.0],
            series_id: SeriesId::new(id),
        }
    }

    #[tokio::test]
    async fn send_before_ready_is_dropped() {
        let (bridge, mut view) = channel(4);

        assert_eq!(
            bridge.send_update(series("bitcoin")),
            Err(BridgeError::ChannelUnavailable)
        );
        assert!(view.commands.try_recv().is_err());

        view.confirm_ready();
        assert!(bridge.send_update(series("bitcoin")).is_ok());
        assert!(matches!(
            view.commands.try_recv(),
            Ok(ChartCommand::Update(_))
        ));
    }

    #[tokio::test]
    async fn commands_arrive_in_send_order() {
        let (bridge, mut view) = channel(4);
        view.confirm_ready();

        bridge.send_loading().unwrap();
        bridge.send_update(series("bitcoin")).unwrap();
        bridge.send_reset().unwrap();

        assert!(matches!(view.commands.recv().await, Some(ChartCommand::Loading)));
        assert!(matches!(view.commands.recv().await, Some(ChartCommand::Update(_))));
        assert!(matches!(view.commands.recv().await, Some(ChartCommand::Reset)));
    }

    #[tokio::test]
    async fn send_after_view_teardown_fails() {
        let (bridge, view) = channel(4);
        view.confirm_ready();
        drop(view);

        assert_eq!(bridge.send_loading(), Err(BridgeError::ChannelUnavailable));
    }

    #[tokio::test]
    async fn ready_resolves_once_view_comes_up() {
        let (bridge, view) = channel(4);
        assert!(!bridge.is_ready());

        let waiter = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.ready().await }
        });
        view.confirm_ready();
        waiter.await.unwrap();

        assert!(bridge.is_ready());
    }
}
