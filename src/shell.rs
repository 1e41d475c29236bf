//! Terminal host
//!
//! Turns typed lines into events and prints each snapshot as the turns
//! that changed since the last one. The shell owns no conversation state;
//! the latest [`ChatView`] is only kept to resolve button numbers.

use crate::runtime::{ChatHandle, ViewEvent};
use crate::state_machine::{Event, MenuItem};
use crate::transcript::{latest_buttons, Sender, Turn, VisualTag};
use crate::view::ChatView;
use std::fmt::Write as _;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;

pub const HELP: &str = "\
명령어:
  #N          N번 버튼 선택
  /menu       메뉴 열기/닫기
  /item N     메뉴의 N번 항목 선택
  /new        새 채팅
  /merchant   가맹점 조회
  /close      종료
  그 외 입력은 질문으로 전송됩니다.
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleMenu,
    NewChat,
    Merchant,
    Close,
    Help,
    /// 1-based index into the dropdown
    MenuItem(usize),
    /// 1-based index into the latest buttons
    Button(usize),
    Text(String),
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("unknown command {0:?}, type /help")]
    UnknownCommand(String),
    #[error("no button #{0}")]
    NoSuchButton(usize),
    #[error("no menu item {0}")]
    NoSuchMenuItem(usize),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<Result<Command, ShellError>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(number) = trimmed.strip_prefix('#') {
        return Some(
            number
                .trim()
                .parse()
                .map(Command::Button)
                .map_err(|_| ShellError::UnknownCommand(trimmed.to_string())),
        );
    }

    let Some(command) = trimmed.strip_prefix('/') else {
        return Some(Ok(Command::Text(line.to_string())));
    };
    let mut parts = command.split_whitespace();
    let parsed = match (parts.next(), parts.next()) {
        (Some("menu"), None) => Ok(Command::ToggleMenu),
        (Some("new"), None) => Ok(Command::NewChat),
        (Some("merchant"), None) => Ok(Command::Merchant),
        (Some("close" | "quit"), None) => Ok(Command::Close),
        (Some("help"), None) => Ok(Command::Help),
        (Some("item"), Some(n)) => n
            .parse()
            .map(Command::MenuItem)
            .map_err(|_| ShellError::UnknownCommand(trimmed.to_string())),
        _ => Err(ShellError::UnknownCommand(trimmed.to_string())),
    };
    Some(parsed)
}

/// Translate a command into the events it stands for
pub fn resolve(command: Command, view: Option<&ChatView>) -> Result<Vec<Event>, ShellError> {
    let events = match command {
        Command::ToggleMenu => vec![Event::ToggleMenu],
        Command::NewChat => vec![Event::MenuItemSelected {
            item: MenuItem::NewChat,
        }],
        Command::Merchant => vec![Event::StartMerchantFlow],
        Command::Close => vec![Event::CloseWindow],
        Command::Help => vec![],
        Command::MenuItem(n) => {
            let entry = view
                .and_then(|v| n.checked_sub(1).and_then(|i| v.menu_items.get(i)))
                .ok_or(ShellError::NoSuchMenuItem(n))?;
            vec![Event::MenuItemSelected { item: entry.item }]
        }
        Command::Button(n) => {
            let button = view
                .and_then(|v| n.checked_sub(1).and_then(|i| latest_buttons(&v.turns).get(i)))
                .ok_or(ShellError::NoSuchButton(n))?;
            vec![Event::ButtonClicked { node: button.node }]
        }
        Command::Text(text) => {
            // Typing a button's exact label clicks it
            let button = view.and_then(|v| {
                latest_buttons(&v.turns)
                    .iter()
                    .find(|b| b.label == text.trim())
            });
            match button {
                Some(button) => vec![Event::ButtonClicked { node: button.node }],
                None => vec![Event::DraftChanged { text }, Event::Submit],
            }
        }
    };
    Ok(events)
}

/// Incremental text renderer
#[derive(Debug, Default)]
pub struct Renderer {
    shown: Vec<Turn>,
    menu_open: bool,
    merchant_result: Option<String>,
}

impl Renderer {
    /// Text for everything that changed since the previous snapshot
    pub fn render(&mut self, view: &ChatView) -> String {
        let mut out = String::new();

        let common = self
            .shown
            .iter()
            .zip(&view.turns)
            .take_while(|(a, b)| a == b)
            .count();
        if common == 0 && !self.shown.is_empty() && !view.turns.is_empty() {
            out.push_str("──────── 새 대화 ────────\n");
        }
        for turn in &view.turns[common..] {
            render_turn(turn, &mut out);
        }
        self.shown = view.turns.clone();

        if view.menu_open && !self.menu_open {
            out.push_str("[메뉴]\n");
            for (i, entry) in view.menu_items.iter().enumerate() {
                let _ = writeln!(out, "  /item {}  {}", i + 1, entry.label);
            }
        }
        self.menu_open = view.menu_open;

        if view.merchant_result != self.merchant_result {
            if let Some(result) = &view.merchant_result {
                out.push_str("[가맹점 정보]\n");
                match &view.merchant_record {
                    Some(record) => {
                        for (key, value) in &record.fields {
                            let _ = writeln!(out, "  {key}: {value}");
                        }
                    }
                    // Free-form result with no key/value lines
                    None => {
                        for line in result.lines() {
                            let _ = writeln!(out, "  {line}");
                        }
                    }
                }
            }
            self.merchant_result = view.merchant_result.clone();
        }

        out
    }
}

fn render_turn(turn: &Turn, out: &mut String) {
    let prefix = match turn.sender {
        Sender::User => "나",
        Sender::Bot => "봇",
    };
    let tag = match turn.visual_tag {
        Some(VisualTag::Pending) => "… ",
        Some(VisualTag::Error) => "[오류] ",
        None => "",
    };
    let _ = writeln!(out, "{prefix}> {tag}{}", turn.text);
    if !turn.buttons.is_empty() {
        let buttons: Vec<String> = turn
            .buttons
            .iter()
            .enumerate()
            .map(|(i, b)| format!("[#{}] {}", i + 1, b.label))
            .collect();
        let _ = writeln!(out, "   {}", buttons.join("  "));
    }
}

/// Drive one chat window from stdin until it closes
pub async fn run(
    handle: ChatHandle,
    mut views: broadcast::Receiver<ViewEvent>,
) -> Result<(), ShellError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut renderer = Renderer::default();
    let mut latest: Option<ChatView> = None;
    let mut stdin_open = true;

    stdout.write_all(HELP.as_bytes()).await?;

    loop {
        tokio::select! {
            update = views.recv() => match update {
                Ok(ViewEvent::Snapshot(view)) => {
                    stdout.write_all(renderer.render(&view).as_bytes()).await?;
                    latest = Some(view);
                }
                Ok(ViewEvent::Rejected { message }) => {
                    stdout.write_all(format!("! {message}\n").as_bytes()).await?;
                }
                Ok(ViewEvent::Closed) | Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Shell fell behind view updates");
                }
            },

            // Input after a close request is left unread
            line = lines.next_line(), if stdin_open && !handle.is_closed() => match line? {
                Some(line) => {
                    let events = match parse_command(&line) {
                        None => continue,
                        Some(Ok(Command::Help)) => {
                            stdout.write_all(HELP.as_bytes()).await?;
                            continue;
                        }
                        Some(parsed) => parsed.and_then(|cmd| resolve(cmd, latest.as_ref())),
                    };
                    match events {
                        Ok(events) => {
                            for event in events {
                                if handle.send(event).await.is_err() {
                                    return Ok(());
                                }
                            }
                        }
                        Err(e) => stdout.write_all(format!("! {e}\n").as_bytes()).await?,
                    }
                }
                None => {
                    // EOF closes the window; keep draining until the runtime confirms
                    stdin_open = false;
                    if handle.send(Event::CloseWindow).await.is_err() {
                        break;
                    }
                }
            },
        }
        stdout.flush().await?;
    }

    stdout.flush().await?;
    Ok(())
}
