use tokio::sync::watch;

/// Connectivity as the platform reports it. Two states only; there is no
/// degraded or reconnecting state to model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetState {
    Online,
    Offline,
}

impl NetState {
    pub fn is_online(&self) -> bool {
        matches!(self, NetState::Online)
    }
}

/// Create a connectivity pair seeded with the platform's current signal.
///
/// The handle is the write side, fed by whatever shell embeds the engine
/// (browser events, a reachability probe, a test). The monitor is the read
/// side the sync agent watches. Repeated identical signals are collapsed so
/// only real transitions wake watchers.
pub fn channel(initial: NetState) -> (ConnectivityHandle, ConnectivityMonitor) {
    let (tx, rx) = watch::channel(initial);
    (ConnectivityHandle { tx }, ConnectivityMonitor { rx })
}

pub struct ConnectivityHandle {
    tx: watch::Sender<NetState>,
}

impl ConnectivityHandle {
    pub fn set(&self, state: NetState) {
        self.tx.send_if_modified(|current| {
            if *current != state {
                *current = state;
                true
            } else {
                false
            }
        });
    }

    pub fn set_online(&self) {
        self.set(NetState::Online);
    }

    pub fn set_offline(&self) {
        self.set(NetState::Offline);
    }

    pub fn current(&self) -> NetState {
        *self.tx.borrow()
    }
}

#[derive(Clone)]
pub struct ConnectivityMonitor {
    rx: watch::Receiver<NetState>,
}

impl ConnectivityMonitor {
    pub fn current(&self) -> NetState {
        *self.rx.borrow()
    }

    /// Wait for the next transition. Errors only when every handle is gone.
    pub async fn changed(&mut self) -> Result<NetState, watch::error::RecvError> {
        self.rx.changed().await?;
        Ok(*self.rx.borrow_and_update())
    }
}
