use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

/// Which form the sign-in prompt should open with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

/// A request for the user to sign in
///
/// `on_success` fires once the sign-in completes; dropping it tells the requester the
/// prompt was dismissed.
#[derive(Debug)]
pub struct SignInPrompt {
    pub mode: AuthMode,
    pub on_success: oneshot::Sender<()>,
}

/// Sign-in precondition consulted before video lookups
pub trait AuthGate: Send + Sync {
    fn is_signed_in(&self) -> bool;

    /// Asks for a sign-in; the receiver resolves when it completes
    fn request_sign_in(&self, mode: AuthMode) -> oneshot::Receiver<()>;
}

/// [`AuthGate`] that delivers prompts over an explicit channel
pub struct ChannelAuthGate {
    signed_in: AtomicBool,
    prompts: mpsc::UnboundedSender<SignInPrompt>,
}

impl ChannelAuthGate {
    /// Creates a signed-out gate and the receiving end of its prompt channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SignInPrompt>) {
        let (prompts, receiver) = mpsc::unbounded_channel();
        let gate = Self {
            signed_in: AtomicBool::new(false),
            prompts,
        };
        (gate, receiver)
    }

    pub fn set_signed_in(&self, signed_in: bool) {
        self.signed_in.store(signed_in, Ordering::SeqCst);
    }
}

impl AuthGate for ChannelAuthGate {
    fn is_signed_in(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }

    fn request_sign_in(&self, mode: AuthMode) -> oneshot::Receiver<()> {
        let (on_success, notified) = oneshot::channel();
        if self.prompts.send(SignInPrompt { mode, on_success }).is_err() {
            tracing::warn!(mode = ?mode, "No listener for sign-in prompt");
        }
        notified
    }
}

struct InboxState {
    receiver: mpsc::UnboundedReceiver<SignInPrompt>,
    pending: Vec<SignInPrompt>,
}

impl InboxState {
    fn drain(&mut self) {
        while let Ok(prompt) = self.receiver.try_recv() {
            self.pending.push(prompt);
        }
    }
}

/// Holds the prompts a gate has sent until the user signs in or dismisses them
pub struct PromptInbox {
    state: Mutex<InboxState>,
}

impl PromptInbox {
    pub fn new(receiver: mpsc::UnboundedReceiver<SignInPrompt>) -> Self {
        Self {
            state: Mutex::new(InboxState {
                receiver,
                pending: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, InboxState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.drain();
        state
    }

    /// Mode of the most recent open prompt, if any
    pub fn pending_mode(&self) -> Option<AuthMode> {
        self.lock().pending.last().map(|prompt| prompt.mode)
    }

    /// Notifies every open prompt of a successful sign-in, returning how many were waiting
    pub fn resolve_all(&self) -> usize {
        let prompts: Vec<SignInPrompt> = self.lock().pending.drain(..).collect();
        let count = prompts.len();
        for prompt in prompts {
            // The requester may already be gone
            let _ = prompt.on_success.send(());
        }
        count
    }

    /// Closes every open prompt without signing in
    pub fn dismiss_all(&self) -> usize {
        let mut state = self.lock();
        let count = state.pending.len();
        state.pending.clear();
        count
    }
}
