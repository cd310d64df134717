use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{mpsc, watch};

use super::models::{Message, Phase, Role, Session};
use super::store::TranscriptStore;
use crate::core::Subscription;
use crate::core::config::{DEFAULT_APP_ID, DEFAULT_SYSTEM_INSTRUCTION};
use crate::gemini::AiGateway;
use crate::identity::{IdentityObserver, User};

struct PendingWrite {
    generation: u64,
    user_id: String,
    message: Message,
}

#[derive(Default)]
struct State {
    phase: Phase,
    messages: Vec<Message>,
    draft: String,
    in_flight: bool,
    persistence_failed: bool,
    // Bumped whenever the active user changes or the controller is torn
    // down. Anything started under an older generation is stale.
    generation: u64,
    identity_sub: Option<Subscription>,
    transcript_sub: Option<Subscription>,
}

struct Inner {
    identity: Arc<dyn IdentityObserver>,
    store: Arc<dyn TranscriptStore>,
    gateway: Arc<dyn AiGateway>,
    namespace: String,
    system_instruction: String,
    state: Mutex<State>,
    updates: watch::Sender<Vec<Message>>,
    writes: mpsc::UnboundedSender<PendingWrite>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the conversation. Subscribers scroll the latest message
    /// into view on every update.
    fn publish(&self, messages: &[Message]) {
        self.updates.send_replace(messages.to_vec());
    }

    fn handle_user_change(self: &Arc<Self>, user: Option<User>) {
        let next = match user {
            Some(user) => Phase::Authenticated(user),
            None => Phase::Guest,
        };

        let (generation, previous_sub) = {
            let mut state = self.state();
            if state.phase == next {
                return;
            }
            tracing::debug!("Session phase {:?} -> {:?}", state.phase, next);
            state.phase = next.clone();
            state.messages.clear();
            state.persistence_failed = false;
            state.generation += 1;
            self.publish(&state.messages);
            (state.generation, state.transcript_sub.take())
        };
        // Release the old transcript outside the lock
        drop(previous_sub);

        let Some(user) = next.user() else {
            return;
        };

        let weak = Arc::downgrade(self);
        let subscription = self.store.subscribe(
            &self.namespace,
            &user.uid,
            Arc::new(move |snapshot| {
                if let Some(inner) = weak.upgrade() {
                    inner.replace_messages(generation, snapshot);
                }
            }),
        );

        let mut state = self.state();
        if state.generation == generation {
            state.transcript_sub = Some(subscription);
        } else {
            // The user changed again while subscribing
            drop(state);
            drop(subscription);
        }
    }

    /// The store is authoritative: a snapshot replaces the in-memory
    /// conversation wholesale, optimistic entries included.
    fn replace_messages(&self, generation: u64, snapshot: Vec<Message>) {
        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!("Dropping transcript snapshot from a previous session");
            return;
        }
        state.messages = snapshot;
        self.publish(&state.messages);
    }

    fn queue_write(&self, generation: u64, user: Option<&User>, message: &Message) {
        let Some(user) = user else {
            return;
        };
        let write = PendingWrite {
            generation,
            user_id: user.uid.clone(),
            message: message.clone(),
        };
        if self.writes.send(write).is_err() {
            tracing::warn!("Transcript writer stopped, message {} not saved", message.id);
        }
    }

    /// Ask the model and append its reply, unless the session changed
    /// while waiting. Always clears the in-flight flag.
    async fn answer(
        &self,
        generation: u64,
        user: Option<User>,
        prompt: String,
    ) -> Option<Message> {
        let reply = self.gateway.ask(&prompt, &self.system_instruction).await;
        let assistant_msg = Message::from_reply(reply);

        {
            let mut state = self.state();
            state.in_flight = false;
            if state.generation != generation {
                tracing::debug!("Discarding reply for a session that has ended");
                return None;
            }
            state.messages.push(assistant_msg.clone());
            self.publish(&state.messages);
        }
        self.queue_write(generation, user.as_ref(), &assistant_msg);

        Some(assistant_msg)
    }
}

/// Writes queued messages one at a time so the durable transcript
/// keeps submit order. Failures are logged and flagged, never retried.
async fn run_writer(
    inner: Weak<Inner>,
    store: Arc<dyn TranscriptStore>,
    namespace: String,
    mut rx: mpsc::UnboundedReceiver<PendingWrite>,
) {
    while let Some(write) = rx.recv().await {
        let result = store.append(&namespace, &write.user_id, &write.message).await;
        if let Err(e) = result {
            tracing::warn!("Failed to save message {}: {}", write.message.id, e);
            if let Some(inner) = inner.upgrade() {
                let mut state = inner.state();
                if state.generation == write.generation {
                    state.persistence_failed = true;
                }
            }
        }
    }
}

/// Owns the visible conversation for one session.
///
/// Follows the identity observer: a signed-in user's conversation
/// mirrors their stored transcript, a guest's lives only in memory.
/// Every change is published on the `updates` channel.
///
/// Use `ControllerBuilder` to construct one. Must be built inside a
/// tokio runtime.
#[derive(Clone)]
pub struct ConversationController {
    inner: Arc<Inner>,
}

impl ConversationController {
    pub fn session(&self) -> Session {
        Session::from(&self.inner.state().phase)
    }

    pub fn phase(&self) -> Phase {
        self.inner.state().phase.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.state().messages.clone()
    }

    /// Whether a question is waiting on the model
    pub fn is_loading(&self) -> bool {
        self.inner.state().in_flight
    }

    /// Whether a write to the stored transcript failed this session
    pub fn persistence_failed(&self) -> bool {
        self.inner.state().persistence_failed
    }

    pub fn draft(&self) -> String {
        self.inner.state().draft.clone()
    }

    pub fn set_draft(&self, text: &str) {
        self.inner.state().draft = text.to_string();
    }

    /// Watch the conversation. A new value is sent after every change.
    pub fn updates(&self) -> watch::Receiver<Vec<Message>> {
        self.inner.updates.subscribe()
    }

    /// Ask a question. Returns the assistant's message, or `None` when
    /// the text is blank, the session isn't ready, another question is
    /// still in flight, or the session changed before the reply came
    /// back.
    pub async fn submit(&self, text: &str) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let user_msg = Message::new(Role::User, text);
        let (generation, user) = {
            let mut state = self.inner.state();
            if state.in_flight || state.phase == Phase::NotReady {
                return None;
            }
            state.draft.clear();
            state.in_flight = true;
            state.messages.push(user_msg.clone());
            self.inner.publish(&state.messages);
            (state.generation, state.phase.user().cloned())
        };
        self.inner.queue_write(generation, user.as_ref(), &user_msg);

        // The reply is applied by a task the controller owns, so a caller
        // that stops waiting doesn't leave the session stuck in flight
        let inner = Arc::clone(&self.inner);
        let prompt = text.to_string();
        let task = tokio::spawn(async move { inner.answer(generation, user, prompt).await });
        match task.await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Answer task failed: {}", e);
                self.inner.state().in_flight = false;
                None
            }
        }
    }

    /// Sign out and clear the conversation.
    pub async fn logout(&self) {
        if let Err(e) = self.inner.identity.sign_out().await {
            tracing::error!("Sign out failed: {}", e);
        }
        let mut state = self.inner.state();
        state.messages.clear();
        self.inner.publish(&state.messages);
    }

    /// Release the identity and transcript subscriptions. Replies still
    /// in flight are discarded when they arrive.
    pub fn teardown(&self) {
        let (identity_sub, transcript_sub) = {
            let mut state = self.inner.state();
            state.generation += 1;
            (state.identity_sub.take(), state.transcript_sub.take())
        };
        drop(identity_sub);
        drop(transcript_sub);
    }
}

pub struct ControllerBuilder {
    identity: Arc<dyn IdentityObserver>,
    store: Arc<dyn TranscriptStore>,
    gateway: Arc<dyn AiGateway>,
    namespace: String,
    system_instruction: String,
}

impl ControllerBuilder {
    pub fn new(
        identity: Arc<dyn IdentityObserver>,
        store: Arc<dyn TranscriptStore>,
        gateway: Arc<dyn AiGateway>,
    ) -> Self {
        Self {
            identity,
            store,
            gateway,
            namespace: DEFAULT_APP_ID.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn system_instruction(mut self, instruction: &str) -> Self {
        self.system_instruction = instruction.to_string();
        self
    }

    /// Build the controller and start following the identity observer.
    pub fn build(self) -> ConversationController {
        let (updates, _) = watch::channel(Vec::new());
        let (writes, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            identity: Arc::clone(&self.identity),
            store: Arc::clone(&self.store),
            gateway: self.gateway,
            namespace: self.namespace.clone(),
            system_instruction: self.system_instruction,
            state: Mutex::new(State::default()),
            updates,
            writes,
        });

        tokio::spawn(run_writer(
            Arc::downgrade(&inner),
            self.store,
            self.namespace,
            rx,
        ));

        let weak = Arc::downgrade(&inner);
        let identity_sub = self.identity.on_change(Arc::new(move |user| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_user_change(user);
            }
        }));
        inner.state().identity_sub = Some(identity_sub);

        ConversationController { inner }
    }
}
