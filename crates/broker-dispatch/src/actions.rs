use broker_transport::Token;

/// Something that needs writing to a socket, recorded by the dispatcher
/// instead of written directly (see the module docs for why).
#[derive(Debug, Clone)]
pub enum Action {
    AckSource { token: Token, ack: [u8; broker_wire::ACK_FRAME_SIZE] },
    SendListener { token: Token, bytes: Vec<u8> },
}

/// An ordered batch of [`Action`]s produced by one round of event handling.
/// Order is significant: actions must be applied in the order they were
/// pushed to preserve per-connection write ordering.
#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: Vec<Action>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, Action> {
        self.actions.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
