//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::{spawn, ChatHandle, ViewEvent};
use crate::catalog::Catalog;
use crate::gateway::{
    GatewayError, LogEntry, QueryReply, QueryRequest, SessionGateway, SessionId,
};
use crate::state_machine::Event;
use crate::view::ChatView;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;

// ============================================================================
// Mock Gateway
// ============================================================================

/// Mock gateway that returns queued replies and records every call
pub struct MockGateway {
    sessions: Mutex<VecDeque<Result<SessionId, GatewayError>>>,
    replies: Mutex<VecDeque<Result<QueryReply, GatewayError>>>,
    /// Record of all questions asked
    pub questions: Mutex<Vec<QueryRequest>>,
    /// Record of all log appends attempted
    pub logs: Mutex<Vec<LogEntry>>,
    fail_logs: AtomicBool,
    /// Delay applied to every question
    delay: Option<Duration>,
    /// Notified when a question reaches the gateway
    pub question_started: Arc<Notify>,
}

#[allow(dead_code)]
impl MockGateway {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(VecDeque::new()),
            replies: Mutex::new(VecDeque::new()),
            questions: Mutex::new(Vec::new()),
            logs: Mutex::new(Vec::new()),
            fail_logs: AtomicBool::new(false),
            delay: None,
            question_started: Arc::new(Notify::new()),
        }
    }

    /// Mock whose questions take `delay` to answer
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn queue_answer(&self, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(QueryReply::answer(text)));
    }

    pub fn queue_reply(&self, reply: Result<QueryReply, GatewayError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Queue the outcome of the next session creation. Unqueued sessions
    /// succeed with a fresh id.
    pub fn queue_session(&self, session: Result<SessionId, GatewayError>) {
        self.sessions.lock().unwrap().push_back(session);
    }

    pub fn fail_logs(&self, fail: bool) {
        self.fail_logs.store(fail, Ordering::SeqCst);
    }

    pub fn recorded_questions(&self) -> Vec<QueryRequest> {
        self.questions.lock().unwrap().clone()
    }

    pub fn recorded_logs(&self) -> Vec<LogEntry> {
        self.logs.lock().unwrap().clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionGateway for MockGateway {
    async fn create_session(&self) -> Result<SessionId, GatewayError> {
        self.sessions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SessionId::new(uuid::Uuid::new_v4().to_string())))
    }

    async fn ask_question(&self, request: &QueryRequest) -> Result<QueryReply, GatewayError> {
        self.questions.lock().unwrap().push(request.clone());
        self.question_started.notify_one();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::network("No mock reply queued")))
    }

    async fn log_message(&self, entry: &LogEntry) -> Result<(), GatewayError> {
        self.logs.lock().unwrap().push(entry.clone());
        if self.fail_logs.load(Ordering::SeqCst) {
            return Err(GatewayError::status(500, "log store unavailable"));
        }
        Ok(())
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

/// A running chat window wired to a [`MockGateway`]
pub struct TestRuntime {
    pub gateway: Arc<MockGateway>,
    handle: ChatHandle,
    views: broadcast::Receiver<ViewEvent>,
    task: JoinHandle<()>,
}

impl TestRuntime {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> TestRuntimeBuilder {
        TestRuntimeBuilder::default()
    }
}

#[derive(Default)]
pub struct TestRuntimeBuilder {
    gateway: Option<MockGateway>,
    catalog: Option<Catalog>,
}

impl TestRuntimeBuilder {
    pub fn gateway(mut self, gateway: MockGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(self) -> TestRuntime {
        let gateway = Arc::new(self.gateway.unwrap_or_default());
        let catalog = self
            .catalog
            .unwrap_or_else(|| Catalog::builtin().expect("builtin catalog"));

        let window = spawn(Arc::new(catalog), gateway.clone());

        TestRuntime {
            gateway,
            handle: window.handle,
            views: window.views,
            task: window.task,
        }
    }
}

impl TestRuntime {
    pub async fn send(&self, event: Event) {
        self.handle.send(event).await.expect("Failed to send event");
    }

    /// Type `text` into the input and submit it
    pub async fn submit(&self, text: &str) {
        self.send(Event::DraftChanged {
            text: text.to_string(),
        })
        .await;
        self.send(Event::Submit).await;
    }

    /// Wait for a snapshot matching `pred`
    pub async fn wait_for_view(
        &mut self,
        pred: impl Fn(&ChatView) -> bool,
        timeout: Duration,
    ) -> Option<ChatView> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.views.recv()).await {
                Ok(Ok(ViewEvent::Snapshot(view))) if pred(&view) => return Some(view),
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                _ => continue,
            }
        }
        None
    }

    /// Wait until nothing is in flight and the transcript is non-empty
    pub async fn wait_for_idle(&mut self) -> ChatView {
        self.wait_for_view(|v| !v.busy && !v.turns.is_empty(), Duration::from_secs(2))
            .await
            .expect("runtime should settle")
    }

    pub async fn wait_for_rejection(&mut self, timeout: Duration) -> Option<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.views.recv()).await {
                Ok(Ok(ViewEvent::Rejected { message })) => return Some(message),
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                _ => continue,
            }
        }
        None
    }

    pub async fn wait_for_closed(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.views.recv()).await {
                Ok(Ok(ViewEvent::Closed) | Err(broadcast::error::RecvError::Closed)) => {
                    return true
                }
                _ => continue,
            }
        }
        false
    }

    /// Wait until at least `count` log appends reached the gateway
    pub async fn wait_for_logs(&self, count: usize, timeout: Duration) -> Vec<LogEntry> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let logs = self.gateway.recorded_logs();
            if logs.len() >= count || tokio::time::Instant::now() >= deadline {
                return logs;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub fn button(&self, view: &ChatView, label: &str) -> Event {
        let button = view
            .turns
            .iter()
            .rev()
            .flat_map(|t| t.buttons.iter())
            .find(|b| b.label == label)
            .unwrap_or_else(|| panic!("no button {label:?}"));
        Event::ButtonClicked { node: button.node }
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ForcedIntent, Role, FAILURE_TEXT};
    use crate::state_machine::transition::{MAIN_PROMPT, MERCHANT_GUIDE};
    use crate::state_machine::MenuItem;
    use crate::transcript::{Sender, VisualTag, PENDING_TEXT};

    const WAIT: Duration = Duration::from_secs(2);

    fn texts(view: &ChatView) -> Vec<&str> {
        view.turns.iter().map(|t| t.text.as_str()).collect()
    }

    #[tokio::test]
    async fn test_launch_opens_main_menu() {
        let mut rt = TestRuntime::new().build();
        let view = rt.wait_for_idle().await;

        assert_eq!(texts(&view), vec![MAIN_PROMPT]);
        assert_eq!(view.turns[0].buttons.len(), 5);
        assert!(!view.merchant_mode);

        let logs = rt.wait_for_logs(1, WAIT).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].role, Role::Assistant);
        assert_eq!(logs[0].message, MAIN_PROMPT);
    }

    #[tokio::test]
    async fn test_category_then_leaf_round_trip() {
        let gateway = MockGateway::new();
        gateway.queue_answer("신규 가맹 신청은 다음 절차로 진행됩니다.");
        let mut rt = TestRuntime::new().gateway(gateway).build();

        let view = rt.wait_for_idle().await;
        rt.send(rt.button(&view, "가맹업무")).await;
        let view = rt
            .wait_for_view(|v| v.turns.len() == 3, WAIT)
            .await
            .expect("category entered");
        assert_eq!(view.turns[1].text, "가맹업무 관련 안내를 진행하겠습니다.");
        assert_eq!(view.turns[2].text, "가맹업무 항목을 선택하세요.");
        assert_eq!(view.turns[2].buttons.len(), 3);

        rt.send(rt.button(&view, "신규가맹신청")).await;
        let pending = rt
            .wait_for_view(|v| v.busy, WAIT)
            .await
            .expect("placeholder shown");
        assert_eq!(pending.turns.last().unwrap().text, PENDING_TEXT);

        let view = rt.wait_for_idle().await;
        assert_eq!(view.turns.len(), 5);
        assert_eq!(view.turns[3].sender, Sender::User);
        assert_eq!(view.turns[3].text, "신규 가맹 신청 절차를 알려주세요.");
        assert_eq!(view.turns[4].text, "신규 가맹 신청은 다음 절차로 진행됩니다.");
        assert!(view.turns.iter().all(|t| !t.is_pending()));

        let questions = rt.gateway.recorded_questions();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "신규 가맹 신청 절차를 알려주세요.");
        assert_eq!(questions[0].forced_intent, None);

        // Logs arrive in transcript order, all against the one session
        let logs = rt.wait_for_logs(5, WAIT).await;
        let logged: Vec<_> = logs.iter().map(|l| (l.role, l.message.as_str())).collect();
        assert_eq!(
            logged,
            vec![
                (Role::Assistant, MAIN_PROMPT),
                (Role::User, "가맹업무 관련 안내를 진행하겠습니다."),
                (Role::Assistant, "가맹업무 항목을 선택하세요."),
                (Role::User, "신규 가맹 신청 절차를 알려주세요."),
                (Role::Assistant, "신규 가맹 신청은 다음 절차로 진행됩니다."),
            ]
        );
        assert!(logs.iter().all(|l| l.session_id == questions[0].session_id));
    }

    #[tokio::test]
    async fn test_gateway_failure_resolves_placeholder() {
        let gateway = MockGateway::new();
        gateway.queue_reply(Err(GatewayError::network("connection refused")));
        let mut rt = TestRuntime::new().gateway(gateway).build();
        rt.wait_for_idle().await;

        rt.submit("온누리상품권 사용처").await;
        rt.wait_for_view(|v| v.busy, WAIT).await;
        let view = rt.wait_for_idle().await;

        let last = view.turns.last().unwrap();
        assert_eq!(last.text, FAILURE_TEXT);
        assert_eq!(last.visual_tag, Some(VisualTag::Error));
        assert_eq!(view.turns.iter().filter(|t| t.is_pending()).count(), 0);
    }

    #[tokio::test]
    async fn test_backend_error_payload_is_shown() {
        let gateway = MockGateway::new();
        gateway.queue_reply(Ok(QueryReply::error("세션이 만료되었습니다.")));
        let mut rt = TestRuntime::new().gateway(gateway).build();
        rt.wait_for_idle().await;

        rt.submit("질문").await;
        rt.wait_for_view(|v| v.busy, WAIT).await;
        let view = rt.wait_for_idle().await;
        assert_eq!(view.turns.last().unwrap().text, "세션이 만료되었습니다.");
    }

    #[tokio::test]
    async fn test_input_rejected_while_question_in_flight() {
        let gateway = MockGateway::delayed(Duration::from_millis(300));
        gateway.queue_answer("첫 답변");
        let started = gateway.question_started.clone();
        let mut rt = TestRuntime::new().gateway(gateway).build();
        rt.wait_for_idle().await;

        rt.submit("첫 질문").await;
        tokio::time::timeout(WAIT, started.notified())
            .await
            .expect("question should start");

        rt.submit("두번째 질문").await;
        let message = rt.wait_for_rejection(WAIT).await.expect("busy rejection");
        assert!(message.contains("in progress"), "got {message}");

        let view = rt.wait_for_idle().await;
        assert_eq!(view.turns.last().unwrap().text, "첫 답변");
        assert_eq!(rt.gateway.recorded_questions().len(), 1);
    }

    #[tokio::test]
    async fn test_merchant_lookup_forces_intent_once() {
        let gateway = MockGateway::new();
        gateway.queue_answer("가맹점명: OO상점\n사업자번호: 123-45-67890");
        gateway.queue_answer("OO상점의 한도금액는 100만원입니다.");
        let mut rt = TestRuntime::new().gateway(gateway).build();
        rt.wait_for_idle().await;

        rt.send(Event::StartMerchantFlow).await;
        let view = rt
            .wait_for_view(|v| v.merchant_mode && !v.busy, WAIT)
            .await
            .expect("merchant flow opened");
        assert_eq!(texts(&view), vec![MERCHANT_GUIDE]);
        assert_eq!(view.input_placeholder, "가맹점 정보를 입력하세요.");

        rt.submit("OO상점").await;
        let view = rt
            .wait_for_view(|v| v.merchant_result.is_some(), WAIT)
            .await
            .expect("result pinned");
        assert!(!view.merchant_mode);
        let record = view.merchant_record.expect("parsed record");
        assert_eq!(record.get("가맹점명"), Some("OO상점"));

        rt.submit("한도는 얼마인가요?").await;
        rt.wait_for_view(|v| v.busy, WAIT).await;
        rt.wait_for_idle().await;

        let questions = rt.gateway.recorded_questions();
        let forced: Vec<_> = questions.iter().map(|q| q.forced_intent).collect();
        assert_eq!(forced, vec![Some(ForcedIntent::MerchantData), None]);
    }

    #[tokio::test]
    async fn test_unmatched_merchant_lookup_is_retried() {
        let gateway = MockGateway::new();
        gateway.queue_reply(Ok(QueryReply {
            answer_type: Some("NO_MATCH".to_string()),
            ..QueryReply::answer("관련 정보를 찾을 수 없습니다.")
        }));
        gateway.queue_answer("가맹점명: OO상점");
        let mut rt = TestRuntime::new().gateway(gateway).build();
        rt.wait_for_idle().await;

        rt.send(Event::StartMerchantFlow).await;
        rt.wait_for_view(|v| v.merchant_mode && !v.busy, WAIT)
            .await
            .expect("merchant flow opened");

        rt.submit("없는상점").await;
        rt.wait_for_view(|v| v.busy, WAIT).await;
        let view = rt.wait_for_idle().await;
        assert_eq!(view.turns.last().unwrap().text, "관련 정보를 찾을 수 없습니다.");
        assert!(view.merchant_mode);
        assert_eq!(view.merchant_result, None);

        rt.submit("OO상점").await;
        let view = rt
            .wait_for_view(|v| v.merchant_result.is_some(), WAIT)
            .await
            .expect("result pinned");
        assert!(!view.merchant_mode);

        let forced: Vec<_> = rt
            .gateway
            .recorded_questions()
            .iter()
            .map(|q| q.forced_intent)
            .collect();
        assert_eq!(
            forced,
            vec![Some(ForcedIntent::MerchantData), Some(ForcedIntent::MerchantData)]
        );
    }

    #[tokio::test]
    async fn test_new_chat_replaces_session() {
        let gateway = MockGateway::new();
        gateway.queue_session(Ok(SessionId::new("first")));
        gateway.queue_session(Ok(SessionId::new("second")));
        let mut rt = TestRuntime::new().gateway(gateway).build();
        let view = rt.wait_for_idle().await;

        rt.send(rt.button(&view, "지류상품권")).await;
        rt.wait_for_view(|v| v.turns.len() == 3, WAIT).await;

        rt.send(Event::MenuItemSelected {
            item: MenuItem::NewChat,
        })
        .await;
        rt.wait_for_view(|v| v.busy, WAIT).await;
        let view = rt.wait_for_idle().await;
        assert_eq!(texts(&view), vec![MAIN_PROMPT]);

        let logs = rt.wait_for_logs(4, WAIT).await;
        assert_eq!(logs.last().unwrap().session_id, SessionId::new("second"));
        assert!(logs[..3].iter().all(|l| l.session_id == SessionId::new("first")));
    }

    #[tokio::test]
    async fn test_session_failure_can_be_retried() {
        let gateway = MockGateway::new();
        gateway.queue_session(Err(GatewayError::network("connection refused")));
        let mut rt = TestRuntime::new().gateway(gateway).build();

        let view = rt.wait_for_idle().await;
        assert_eq!(view.turns.len(), 1);
        assert_eq!(view.turns[0].visual_tag, Some(VisualTag::Error));

        rt.submit("질문").await;
        let message = rt.wait_for_rejection(WAIT).await.expect("no session");
        assert!(message.contains("No session"), "got {message}");

        rt.send(Event::StartMainFlow).await;
        let view = rt
            .wait_for_view(|v| !v.busy && v.turns.len() == 1 && v.turns[0].text == MAIN_PROMPT, WAIT)
            .await
            .expect("retry opens main menu");
        assert_eq!(view.turns[0].buttons.len(), 5);
    }

    #[tokio::test]
    async fn test_log_failures_do_not_block_answers() {
        let gateway = MockGateway::new();
        gateway.fail_logs(true);
        gateway.queue_answer("답변입니다.");
        let mut rt = TestRuntime::new().gateway(gateway).build();
        rt.wait_for_idle().await;

        rt.submit("질문").await;
        rt.wait_for_view(|v| v.busy, WAIT).await;
        let view = rt.wait_for_idle().await;
        assert_eq!(view.turns.last().unwrap().text, "답변입니다.");

        // Every append was still attempted, in order
        let logs = rt.wait_for_logs(3, WAIT).await;
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[1].message, "질문");
    }

    #[tokio::test]
    async fn test_close_stops_runtime_during_pending_call() {
        let gateway = MockGateway::delayed(Duration::from_secs(5));
        gateway.queue_answer("discarded");
        let started = gateway.question_started.clone();
        let mut rt = TestRuntime::new().gateway(gateway).build();
        rt.wait_for_idle().await;

        rt.submit("질문").await;
        tokio::time::timeout(WAIT, started.notified())
            .await
            .expect("question should start");

        let start = tokio::time::Instant::now();
        rt.send(Event::CloseWindow).await;
        assert!(rt.wait_for_closed(WAIT).await, "runtime should close");
        assert!(rt.handle.is_closed());

        tokio::time::timeout(WAIT, &mut rt.task)
            .await
            .expect("runtime task should finish")
            .expect("runtime task should not panic");
        assert!(
            start.elapsed() < Duration::from_secs(3),
            "close should not wait for the pending answer"
        );
    }

    #[tokio::test]
    async fn test_toggle_menu_changes_only_dropdown() {
        let mut rt = TestRuntime::new().build();
        let before = rt.wait_for_idle().await;

        rt.send(Event::ToggleMenu).await;
        let view = rt
            .wait_for_view(|v| v.menu_open, WAIT)
            .await
            .expect("menu opened");
        assert_eq!(view.turns, before.turns);
        assert_eq!(view.menu_items[0].label, "새 채팅");
    }
}
