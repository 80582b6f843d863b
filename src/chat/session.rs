use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

use crate::chat::conversation::Conversation;
use crate::chat::events::{SessionEvent, EVENT_CAPACITY};
use crate::chat::prompt::build_prompt;
use crate::error::ChatError;
use crate::llm::stream_decoder::decode;
use crate::llm::transport::Transport;
use crate::models::{ConversationView, Message, QueryResponse, RetrievedPassage};
use crate::settings::{Mode, Settings};

/// Set while a query is in flight. Only one query may run at a time.
pub struct BusyFlag {
    busy: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl BusyFlag {
    fn new(events: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            busy: AtomicBool::new(false),
            events,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Check-and-set in one step. `None` if a query is already running.
    fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let _ = self.events.send(SessionEvent::BusyChanged { busy: true });
        Some(BusyGuard { flag: self })
    }
}

/// Clears the flag when dropped, whichever way the query ended.
struct BusyGuard<'a> {
    flag: &'a BusyFlag,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.busy.store(false, Ordering::Release);
        let _ = self.flag.events.send(SessionEvent::BusyChanged { busy: false });
    }
}

/// One chat session: the transcript, the busy flag and the transport used
/// to answer queries.
pub struct ChatSession {
    transport: Arc<dyn Transport>,
    conversation: Conversation,
    busy: BusyFlag,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            conversation: Conversation::new(events.clone()),
            busy: BusyFlag::new(events.clone()),
            events,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn view(&self) -> ConversationView {
        ConversationView {
            messages: self.conversation.snapshot(),
            busy: self.is_busy(),
        }
    }

    /// Run the query the way `settings.mode` asks for.
    pub async fn submit(
        &self,
        query: &str,
        settings: &Settings,
    ) -> Result<QueryResponse, ChatError> {
        match settings.mode() {
            Mode::Chat => self
                .submit_turn(query, settings)
                .await
                .map(|message| QueryResponse::Chat { message }),
            Mode::Search => self
                .search(query, settings)
                .await
                .map(|passages| QueryResponse::Search { passages }),
        }
    }

    /// Full chat turn: record the question, retrieve passages, stream the
    /// generated answer and record it. Returns the assistant message.
    ///
    /// On any failure after validation the user message stays in the
    /// transcript, no assistant message is added and the busy flag clears.
    pub async fn submit_turn(
        &self,
        query: &str,
        settings: &Settings,
    ) -> Result<Message, ChatError> {
        validate(query, settings)?;
        let guard = self.busy.try_acquire().ok_or(ChatError::Busy)?;

        let turn_id = Uuid::new_v4();
        let result = self
            .run_turn(query, settings)
            .instrument(tracing::info_span!("turn", %turn_id))
            .await;

        drop(guard);
        if result.is_ok() {
            let _ = self.events.send(SessionEvent::FocusInput);
        }
        result
    }

    /// Search mode: retrieval only. The transcript is not touched.
    pub async fn search(
        &self,
        query: &str,
        settings: &Settings,
    ) -> Result<Vec<RetrievedPassage>, ChatError> {
        validate(query, settings)?;
        let guard = self.busy.try_acquire().ok_or(ChatError::Busy)?;

        let search_id = Uuid::new_v4();
        let result = self
            .retrieve(query, settings)
            .instrument(tracing::info_span!("search", %search_id))
            .await;

        drop(guard);
        if result.is_ok() {
            let _ = self.events.send(SessionEvent::FocusInput);
        }
        result
    }

    async fn run_turn(&self, query: &str, settings: &Settings) -> Result<Message, ChatError> {
        self.conversation.append(Message::user(query));

        let passages = self.retrieve(query, settings).await?;
        let prompt = build_prompt(query, &passages);

        let body = self
            .transport
            .generate(&prompt, settings.api_key())
            .await
            .map_err(|e| {
                tracing::warn!("Generation failed: {e:#}");
                ChatError::generation(e)
            })?;

        // A broken stream drops whatever was decoded; only complete answers
        // are recorded.
        let answer = decode(body).await?;
        tracing::info!("Answer complete ({} chars)", answer.chars().count());

        let message = Message::assistant(answer);
        self.conversation.append(message.clone());
        Ok(message)
    }

    async fn retrieve(
        &self,
        query: &str,
        settings: &Settings,
    ) -> Result<Vec<RetrievedPassage>, ChatError> {
        let passages = self
            .transport
            .retrieve(query, settings.api_key(), settings.match_count())
            .await
            .map_err(|e| {
                tracing::warn!("Retrieval failed: {e:#}");
                ChatError::retrieval(e)
            })?;
        tracing::info!("Retrieved {} passages", passages.len());
        Ok(passages)
    }
}

fn validate(query: &str, settings: &Settings) -> Result<(), ChatError> {
    if settings.api_key().trim().is_empty() {
        return Err(ChatError::validation("Please enter an API key."));
    }
    if query.trim().is_empty() {
        return Err(ChatError::validation("Please enter a query."));
    }
    Ok(())
}
