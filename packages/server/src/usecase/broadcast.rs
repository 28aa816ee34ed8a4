//! UseCase: reload / alert broadcast
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - BroadcastUseCase::reload() / alert() / close_all()
//! - ハンドシェイク済みコネクションのみが対象になること
//!
//! ### なぜこのテストが必要か
//! - ブロードキャストは外部の呼び出し元から見える唯一の書き込み口
//! - 遅い・死んだクライアントで呼び出し元がブロックされないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：全ての Live コネクションへの配送
//! - 異常系：クローズ済み、メールボックス満杯
//! - エッジケース：コネクションが 0 件

use std::{sync::Arc, time::Duration};

use futures_util::future::join_all;

use crate::domain::{
    CloseReason, ConnectionHandle, ConnectionRegistry, ENQUEUE_TIMEOUT, EnqueueError,
    PushCommand,
};

/// Outcome of one broadcast, for diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Commands that reached a mailbox.
    pub delivered: usize,
    /// Connections skipped because their handshake is not complete.
    pub skipped: usize,
    /// Connections that closed before or during the enqueue.
    pub closed: usize,
    /// Connections whose mailbox stayed full for the whole deadline.
    pub timed_out: usize,
}

impl BroadcastReport {
    /// Connections the command was handed to (delivered or dropped).
    pub fn attempted(&self) -> usize {
        self.delivered + self.closed + self.timed_out
    }
}

/// Fans one command out to every live connection.
pub struct BroadcastUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    enqueue_timeout: Duration,
}

impl BroadcastUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            registry,
            enqueue_timeout: ENQUEUE_TIMEOUT,
        }
    }

    /// Override how long each enqueue may wait for room.
    pub fn with_enqueue_timeout(mut self, enqueue_timeout: Duration) -> Self {
        self.enqueue_timeout = enqueue_timeout;
        self
    }

    /// Ask every live connection to reload `file`.
    pub async fn reload(&self, file: &str) -> BroadcastReport {
        self.broadcast(PushCommand::reload(file)).await
    }

    /// Ask every live connection to show `message`.
    pub async fn alert(&self, message: &str) -> BroadcastReport {
        self.broadcast(PushCommand::alert(message)).await
    }

    /// Signal every registered connection to close.
    ///
    /// Returns how many connections accepted the signal.
    pub async fn close_all(&self, reason: CloseReason) -> usize {
        let connections = self.registry.snapshot().await;
        let signalled = connections
            .iter()
            .filter(|handle| handle.close(reason))
            .count();
        tracing::debug!(%reason, signalled, "Close signal broadcasted");
        signalled
    }

    /// Enqueue `command` on every handshaken connection concurrently.
    ///
    /// Returns once every enqueue attempt has finished. Never waits for a
    /// client to receive anything.
    async fn broadcast(&self, command: PushCommand) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let targets: Vec<ConnectionHandle> = self
            .registry
            .snapshot()
            .await
            .into_iter()
            .filter(|handle| {
                let live = handle.is_handshake_complete();
                if !live {
                    report.skipped += 1;
                }
                live
            })
            .collect();

        let timeout = self.enqueue_timeout;
        let results = join_all(targets.iter().map(|handle| {
            let command = command.clone();
            async move {
                (
                    handle.id(),
                    handle.enqueue_with_timeout(command, timeout).await,
                )
            }
        }))
        .await;

        for (id, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(EnqueueError::Closed) => {
                    report.closed += 1;
                    tracing::debug!(connection = %id, "Connection closed before delivery, dropped");
                }
                Err(EnqueueError::TimedOut) => {
                    report.timed_out += 1;
                    tracing::warn!(connection = %id, ?timeout, "Connection did not accept command in time, dropped");
                }
            }
        }

        tracing::debug!(?command, ?report, "Broadcast finished");
        report
    }
}
