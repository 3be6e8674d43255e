use tokio::task::JoinHandle;

/// Spawned task that gets aborted when dropped.
#[must_use]
#[derive(derive_more::From)]
pub struct Task(JoinHandle<()>);

impl Task {
    pub fn spawn(future: impl Future<Output = ()> + Send + 'static) -> Self {
        Self(tokio::spawn(future))
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn test_abort_on_drop() {
        let (sender, receiver) = oneshot::channel::<()>();
        let task = Task::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            let _ = sender.send(());
        });
        drop(task);
        // The sender is dropped together with the aborted future.
        assert!(receiver.await.is_err());
    }
}
