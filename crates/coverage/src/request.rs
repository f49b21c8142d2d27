use tokio_util::sync::CancellationToken;

/// Hands out tickets for data loads. Only the newest ticket is current;
/// issuing a new one cancels the one before it.
#[derive(Debug, Default)]
pub struct RequestTracker {
    generation: u64,
    current: Option<CancellationToken>,
}

#[derive(Debug, Clone)]
pub struct RequestTicket {
    generation: u64,
    token: CancellationToken,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once a newer request supersedes this one.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> RequestTicket {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        self.generation += 1;
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        log::trace!("issued request ticket {}", self.generation);
        RequestTicket {
            generation: self.generation,
            token,
        }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        ticket.generation == self.generation && !ticket.is_cancelled()
    }

    pub fn cancel(&mut self) {
        if let Some(current) = self.current.take() {
            current.cancel();
        }
    }
}
