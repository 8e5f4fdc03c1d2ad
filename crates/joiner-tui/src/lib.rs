// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use joiner_app::{
    ActionKind, Anchor, Binding, EditorSession, ElementId, FieldChange, FieldRef, JoinerNode,
    KeyOutcome, NodeHost, NodeId, OverlayKey, RestoreOutcome, Size, SlotIndex, TextInputConfig,
    TriggerKind, Widget, WidgetKind, WidgetValue, floor_char_boundary,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs};
use serde_json::Value;
use std::io;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(4);
const HEADER_ROWS: u16 = 3;
const FIELD_INDENT: u16 = 4;
const FOCUS_MARKER_WIDTH: u16 = 2;
const FIELD_TEXT_LINES: usize = 3;
const PREVIEW_ROWS: u16 = 6;

/// One node as the persistence layer stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedNode {
    pub id: NodeId,
    pub size: Size,
    pub widgets_values: Vec<Value>,
}

impl SavedNode {
    pub fn capture(node: &JoinerNode) -> Self {
        Self {
            id: node.id(),
            size: node.size(),
            widgets_values: node.serialize(),
        }
    }
}

/// Rebuilds a node the way the editor does on load: create with defaults,
/// run the restore protocol, then apply the saved size.
pub fn restore_node<H: NodeHost>(saved: &SavedNode, host: &mut H) -> (JoinerNode, RestoreOutcome) {
    let mut node = JoinerNode::create(saved.id, host);
    let outcome = node.configure(&saved.widgets_values, host);
    if let RestoreOutcome::Fallback(reason) = &outcome {
        log::warn!("node {} restored from raw values: {reason:?}", saved.id.get());
    }
    node.resize(saved.size);
    (node, outcome)
}

pub trait AppRuntime {
    fn load_workflow(&mut self) -> Result<Vec<SavedNode>>;
    fn save_workflow(&mut self, nodes: &[SavedNode]) -> Result<()>;
    fn fetch_candidates(&mut self, kind: TriggerKind) -> Result<Vec<String>>;
    fn spawn_candidate_fetch(&mut self, tx: Sender<InternalEvent>) -> Result<()> {
        for kind in TriggerKind::ALL {
            let result = self
                .fetch_candidates(kind)
                .map_err(|error| format!("{error:#}"));
            tx.send(InternalEvent::Candidates { kind, result })
                .map_err(|_| anyhow!("candidate event channel closed"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    DeferredReorder {
        node: NodeId,
    },
    Candidates {
        kind: TriggerKind,
        result: std::result::Result<Vec<String>, String>,
    },
}

/// Host without a screen: hands out element ids and keeps rejections.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    next_element: u64,
    rejections: Vec<String>,
}

impl HeadlessHost {
    pub fn rejections(&self) -> &[String] {
        &self.rejections
    }
}

impl NodeHost for HeadlessHost {
    fn create_text_input(
        &mut self,
        _node: NodeId,
        _name: &str,
        _config: TextInputConfig,
    ) -> Option<ElementId> {
        self.next_element += 1;
        Some(ElementId::new(self.next_element))
    }

    fn detach_element(&mut self, _element: ElementId) {}

    fn request_resize(&mut self, _node: NodeId, _size: Size) {}

    fn request_redraw(&mut self, _node: NodeId) {}

    fn schedule_deferred_reorder(&mut self, _node: NodeId, _delay: Duration) {}

    fn notify_rejection(&mut self, _node: NodeId, message: &str) {
        self.rejections.push(message.to_owned());
    }
}

/// Terminal host: deferred reorders come back through the internal event
/// channel, rejections surface in the status bar.
#[derive(Debug)]
struct TuiHost {
    tx: Sender<InternalEvent>,
    next_element: u64,
    rejections: Vec<String>,
}

impl TuiHost {
    fn new(tx: Sender<InternalEvent>) -> Self {
        Self {
            tx,
            next_element: 0,
            rejections: Vec::new(),
        }
    }
}

impl NodeHost for TuiHost {
    fn create_text_input(
        &mut self,
        node: NodeId,
        name: &str,
        config: TextInputConfig,
    ) -> Option<ElementId> {
        self.next_element += 1;
        log::trace!(
            "node {} input {name} (multiline: {}) -> element {}",
            node.get(),
            config.multiline,
            self.next_element
        );
        Some(ElementId::new(self.next_element))
    }

    fn detach_element(&mut self, element: ElementId) {
        log::trace!("detached element {}", element.get());
    }

    fn request_resize(&mut self, node: NodeId, size: Size) {
        log::trace!("node {} resized to {}x{}", node.get(), size.width, size.height);
    }

    // Every loop iteration redraws.
    fn request_redraw(&mut self, _node: NodeId) {}

    fn schedule_deferred_reorder(&mut self, node: NodeId, delay: Duration) {
        schedule_deferred_reorder(&self.tx, node, delay);
    }

    fn notify_rejection(&mut self, _node: NodeId, message: &str) {
        self.rejections.push(message.to_owned());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    JoinString,
    Trim,
    Action(ActionKind),
    Field(SlotIndex),
}

impl FocusTarget {
    fn for_widget(widget: &Widget) -> Option<Self> {
        match widget.kind {
            WidgetKind::JoinString => Some(Self::JoinString),
            WidgetKind::TrimWhitespace => Some(Self::Trim),
            WidgetKind::Action(action) => Some(Self::Action(action)),
            WidgetKind::Field(slot) => Some(Self::Field(slot)),
            WidgetKind::Payload => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct WidgetRow {
    target: FocusTarget,
    offset: u16,
    lines: Vec<String>,
}

#[derive(Debug)]
struct Editor {
    nodes: Vec<JoinerNode>,
    session: EditorSession,
    host: TuiHost,
    node_index: usize,
    focus: FocusTarget,
    cursor: usize,
    status: Option<String>,
    status_token: u64,
    dirty: bool,
    quit_armed: bool,
    help_visible: bool,
}

impl Editor {
    fn new(nodes: Vec<JoinerNode>, host: TuiHost) -> Self {
        let mut editor = Self {
            nodes,
            session: EditorSession::default(),
            host,
            node_index: 0,
            focus: FocusTarget::JoinString,
            cursor: 0,
            status: None,
            status_token: 0,
            dirty: false,
            quit_armed: false,
            help_visible: false,
        };
        editor.focus_first_field();
        editor
    }

    fn load<R: AppRuntime>(runtime: &mut R, tx: &Sender<InternalEvent>) -> Result<Self> {
        let saved = runtime.load_workflow().context("load workflow")?;
        let mut host = TuiHost::new(tx.clone());
        let mut nodes = saved
            .iter()
            .map(|saved| restore_node(saved, &mut host).0)
            .collect::<Vec<_>>();
        if nodes.is_empty() {
            nodes.push(JoinerNode::create(NodeId::new(1), &mut host));
        }
        log::info!("editing {} node(s)", nodes.len());
        Ok(Self::new(nodes, host))
    }

    fn node(&self) -> Option<&JoinerNode> {
        self.nodes.get(self.node_index)
    }

    fn saved_nodes(&self) -> Vec<SavedNode> {
        self.nodes.iter().map(SavedNode::capture).collect()
    }

    fn focus_targets(&self) -> Vec<FocusTarget> {
        self.node()
            .map(|node| {
                node.widgets()
                    .iter()
                    .filter(|widget| !widget.hidden)
                    .filter_map(FocusTarget::for_widget)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn focus_first_field(&mut self) {
        let first = self
            .focus_targets()
            .into_iter()
            .find(|target| matches!(target, FocusTarget::Field(_)))
            .unwrap_or(FocusTarget::JoinString);
        self.set_focus(first);
    }

    fn set_focus(&mut self, target: FocusTarget) {
        self.focus = target;
        self.cursor = self.focused_text().map_or(0, str::len);
    }

    fn move_focus(&mut self, delta: isize) {
        let targets = self.focus_targets();
        if targets.is_empty() {
            return;
        }
        let current = targets
            .iter()
            .position(|target| *target == self.focus)
            .unwrap_or(0);
        let next = current
            .saturating_add_signed(delta)
            .min(targets.len() - 1);
        self.session.close();
        self.set_focus(targets[next]);
    }

    fn switch_node(&mut self, delta: isize) {
        if self.nodes.is_empty() {
            return;
        }
        let next = self
            .node_index
            .saturating_add_signed(delta)
            .min(self.nodes.len() - 1);
        if next != self.node_index {
            self.session.close();
            self.node_index = next;
            self.focus_first_field();
        }
    }

    fn focused_text(&self) -> Option<&str> {
        let node = self.node()?;
        match self.focus {
            FocusTarget::JoinString => Some(node.join_string()),
            FocusTarget::Field(slot) => node.field_value(slot),
            FocusTarget::Trim | FocusTarget::Action(_) => None,
        }
    }

    fn focused_field(&self) -> Option<FieldRef> {
        match (self.node(), self.focus) {
            (Some(node), FocusTarget::Field(slot)) => Some(FieldRef::new(node.id(), slot)),
            _ => None,
        }
    }

    /// Keeps focus on a widget that still exists after a structural change.
    fn repair_focus(&mut self) {
        let targets = self.focus_targets();
        if targets.contains(&self.focus) {
            self.cursor = floor_char_boundary(self.focused_text().unwrap_or_default(), self.cursor);
            return;
        }
        let fallback = targets
            .iter()
            .rev()
            .find(|target| matches!(target, FocusTarget::Field(_)))
            .or_else(|| targets.last())
            .copied()
            .unwrap_or(FocusTarget::JoinString);
        self.set_focus(fallback);
    }
}

pub fn run_app<R: AppRuntime>(runtime: &mut R) -> Result<()> {
    let (internal_tx, internal_rx) = mpsc::channel();
    let mut editor = Editor::load(runtime, &internal_tx)?;
    if let Err(error) = runtime.spawn_candidate_fetch(internal_tx.clone()) {
        log::warn!("candidate fetch not started: {error:#}");
    }

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut result = Ok(());
    loop {
        process_internal_events(&mut editor, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, &editor)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(&mut editor, runtime, &internal_tx, key) {
                        break;
                    }
                }
                Event::Mouse(mouse) => {
                    let size = terminal.size().context("read terminal size")?;
                    let screen = Rect::new(0, 0, size.width, size.height);
                    handle_mouse_event(&mut editor, screen, mouse);
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), DisableMouseCapture, terminal::LeaveAlternateScreen)
        .context("leave alternate screen")?;
    result
}

fn process_internal_events(
    editor: &mut Editor,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == editor.status_token => {
                editor.status = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::DeferredReorder { node } => {
                if let Some(target) = editor.nodes.iter_mut().find(|target| target.id() == node) {
                    target.run_deferred_reorder(&mut editor.host);
                }
            }
            InternalEvent::Candidates { kind, result } => {
                let failed = result.is_err();
                let count = editor
                    .session
                    .source_mut()
                    .populate(kind, result.map_err(anyhow::Error::msg));
                if failed {
                    emit_status(editor, tx, format!("{} suggestions unavailable", kind.as_str()));
                } else {
                    log::info!("loaded {count} {} candidates", kind.as_str());
                }
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_DELAY);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

/// One-shot; a node removed in the meantime simply ignores it.
fn schedule_deferred_reorder(internal_tx: &Sender<InternalEvent>, node: NodeId, delay: Duration) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(delay);
        let _ = sender.send(InternalEvent::DeferredReorder { node });
    });
}

fn emit_status(
    editor: &mut Editor,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    editor.status = Some(message.into());
    editor.status_token = editor.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, editor.status_token);
}

fn flush_rejections(editor: &mut Editor, internal_tx: &Sender<InternalEvent>) {
    if let Some(message) = editor.host.rejections.drain(..).last() {
        emit_status(editor, internal_tx, message);
    }
}

fn handle_key_event<R: AppRuntime>(
    editor: &mut Editor,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if key.code == KeyCode::Char('q') && ctrl {
        if editor.dirty && !editor.quit_armed {
            editor.quit_armed = true;
            emit_status(editor, internal_tx, "unsaved changes; ctrl+q again to quit");
            return false;
        }
        return true;
    }
    editor.quit_armed = false;

    if editor.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::F(1)) {
            editor.help_visible = false;
        }
        return false;
    }

    if editor.session.overlay().is_visible()
        && let Some(overlay_key) = overlay_key_for(key)
    {
        handle_overlay_key(editor, overlay_key);
        return false;
    }

    if ctrl {
        match key.code {
            KeyCode::Char('s') => save_workflow(editor, runtime, internal_tx),
            KeyCode::Char('a') => run_action(editor, internal_tx, ActionKind::AddField),
            KeyCode::Char('r') => run_action(editor, internal_tx, ActionKind::RemoveField),
            KeyCode::Char('e') => split_focused_field(editor, internal_tx),
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::F(1) => {
            editor.session.close();
            editor.help_visible = true;
        }
        KeyCode::Up => editor.move_focus(-1),
        KeyCode::Down => editor.move_focus(1),
        KeyCode::PageUp => editor.switch_node(-1),
        KeyCode::PageDown => editor.switch_node(1),
        KeyCode::Esc => {
            editor.session.close();
        }
        _ => handle_focused_key(editor, internal_tx, key),
    }
    false
}

fn overlay_key_for(key: KeyEvent) -> Option<OverlayKey> {
    match key.code {
        KeyCode::Up => Some(OverlayKey::Up),
        KeyCode::Down => Some(OverlayKey::Down),
        KeyCode::Enter => Some(OverlayKey::Enter),
        KeyCode::Tab => Some(OverlayKey::Tab),
        KeyCode::Esc => Some(OverlayKey::Escape),
        _ => None,
    }
}

fn handle_overlay_key(editor: &mut Editor, key: OverlayKey) {
    let owner = editor.session.overlay().owner();
    let Some(node) = owner.and_then(|owner| {
        editor
            .nodes
            .iter_mut()
            .find(|node| node.id() == owner.node)
    }) else {
        editor.session.close();
        return;
    };

    if let KeyOutcome::Committed { field, cursor } =
        editor.session.on_key(key, node, &mut editor.host)
    {
        editor.dirty = true;
        if editor.focused_field() == Some(field) {
            editor.cursor = cursor;
        }
    }
}

/// Hover highlights a completion, a left click commits it, a click
/// anywhere else dismisses the popup.
fn handle_mouse_event(editor: &mut Editor, area: Rect, mouse: MouseEvent) {
    let Some((popup, count)) = completion_popup(editor, area) else {
        return;
    };
    let inside = mouse.column > popup.x
        && mouse.column < popup.right().saturating_sub(1)
        && mouse.row > popup.y
        && mouse.row < popup.bottom().saturating_sub(1);
    let index = usize::from(mouse.row.saturating_sub(popup.y + 1));

    match mouse.kind {
        MouseEventKind::Moved if inside && index < count => {
            editor.session.on_hover(index);
        }
        MouseEventKind::Down(MouseButton::Left) if inside && index < count => {
            let owner = editor.session.overlay().owner();
            let Some(node) = owner.and_then(|owner| {
                editor
                    .nodes
                    .iter_mut()
                    .find(|node| node.id() == owner.node)
            }) else {
                editor.session.close();
                return;
            };
            if let KeyOutcome::Committed { field, cursor } =
                editor.session.on_click(index, node, &mut editor.host)
            {
                editor.dirty = true;
                if editor.focused_field() == Some(field) {
                    editor.cursor = cursor;
                }
            }
        }
        MouseEventKind::Down(_) if !inside => {
            editor.session.close();
        }
        _ => {}
    }
}

fn handle_focused_key(editor: &mut Editor, internal_tx: &Sender<InternalEvent>, key: KeyEvent) {
    match editor.focus {
        FocusTarget::Trim => {
            if matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) {
                toggle_trim(editor);
            }
        }
        FocusTarget::Action(action) => {
            if matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) {
                run_action(editor, internal_tx, action);
            }
        }
        FocusTarget::JoinString => {
            if key.code == KeyCode::Enter {
                return;
            }
            let Some(mut text) = editor.focused_text().map(str::to_owned) else {
                return;
            };
            if edit_text(&mut text, &mut editor.cursor, key)
                && let Some(node) = editor.nodes.get_mut(editor.node_index)
            {
                node.set_fixed_value(
                    joiner_app::JOIN_STRING_WIDGET,
                    WidgetValue::Text(text),
                    &mut editor.host,
                );
                editor.dirty = true;
            }
        }
        FocusTarget::Field(slot) => {
            let Some(mut text) = editor.focused_text().map(str::to_owned) else {
                return;
            };
            let changed = edit_text(&mut text, &mut editor.cursor, key);
            let Some(node) = editor.nodes.get_mut(editor.node_index) else {
                return;
            };
            if changed {
                node.set_field_value(slot, &text, &mut editor.host);
                editor.dirty = true;
            }
            let anchor = field_anchor(node, slot);
            let field = FieldRef::new(node.id(), slot);
            editor.session.on_input(field, &text, editor.cursor, anchor);
        }
    }
}

fn toggle_trim(editor: &mut Editor) {
    let Some(node) = editor.nodes.get_mut(editor.node_index) else {
        return;
    };
    let next = !node.trim_whitespace();
    if node.set_fixed_value(
        joiner_app::TRIM_WHITESPACE_WIDGET,
        WidgetValue::Toggle(next),
        &mut editor.host,
    ) {
        editor.dirty = true;
    }
}

fn run_action(editor: &mut Editor, internal_tx: &Sender<InternalEvent>, action: ActionKind) {
    let Some(node) = editor.nodes.get_mut(editor.node_index) else {
        return;
    };
    let change = match action {
        ActionKind::AddField => node.add_field(&mut editor.host),
        ActionKind::RemoveField => node.remove_field(&mut editor.host),
    };
    editor.session.release_stale_binding(node);
    match change {
        FieldChange::Created(slot) => {
            editor.dirty = true;
            if matches!(editor.focus, FocusTarget::Field(_)) {
                editor.set_focus(FocusTarget::Field(slot));
            }
            emit_status(editor, internal_tx, format!("added text_{slot}"));
        }
        FieldChange::Removed(slot) => {
            editor.dirty = true;
            editor.repair_focus();
            emit_status(editor, internal_tx, format!("removed text_{slot}"));
        }
        FieldChange::Rejected(_) => flush_rejections(editor, internal_tx),
        FieldChange::Existing(_) => {}
    }
}

fn split_focused_field(editor: &mut Editor, internal_tx: &Sender<InternalEvent>) {
    let FocusTarget::Field(slot) = editor.focus else {
        emit_status(editor, internal_tx, "focus a text box to split it");
        return;
    };
    let Some(node) = editor.nodes.get_mut(editor.node_index) else {
        return;
    };
    let delimiter = node.join_string().to_owned();
    let written = node.split_field(slot, &delimiter, &mut editor.host);
    editor.session.close();
    if written == 0 {
        emit_status(editor, internal_tx, "nothing to split");
        return;
    }
    editor.dirty = true;
    editor.repair_focus();
    emit_status(editor, internal_tx, format!("split into {written} text boxes"));
}

fn save_workflow<R: AppRuntime>(
    editor: &mut Editor,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
) {
    let nodes = editor.saved_nodes();
    match runtime.save_workflow(&nodes) {
        Ok(()) => {
            editor.dirty = false;
            emit_status(editor, internal_tx, format!("saved {} node(s)", nodes.len()));
        }
        Err(error) => {
            log::error!("save failed: {error:#}");
            emit_status(editor, internal_tx, format!("save failed: {error}"));
        }
    }
}

/// Applies an editing key to `text`. Returns whether the text changed.
fn edit_text(text: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    *cursor = floor_char_boundary(text, *cursor);
    match key.code {
        KeyCode::Char(ch)
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
        {
            text.insert(*cursor, ch);
            *cursor += ch.len_utf8();
            true
        }
        KeyCode::Enter => {
            text.insert(*cursor, '\n');
            *cursor += 1;
            true
        }
        KeyCode::Backspace => {
            let Some((start, _)) = text[..*cursor].char_indices().next_back() else {
                return false;
            };
            text.replace_range(start..*cursor, "");
            *cursor = start;
            true
        }
        KeyCode::Delete => {
            let Some(ch) = text[*cursor..].chars().next() else {
                return false;
            };
            text.replace_range(*cursor..*cursor + ch.len_utf8(), "");
            true
        }
        KeyCode::Left => {
            if let Some((start, _)) = text[..*cursor].char_indices().next_back() {
                *cursor = start;
            }
            false
        }
        KeyCode::Right => {
            if let Some(ch) = text[*cursor..].chars().next() {
                *cursor += ch.len_utf8();
            }
            false
        }
        KeyCode::Home => {
            *cursor = 0;
            false
        }
        KeyCode::End => {
            *cursor = text.len();
            false
        }
        _ => false,
    }
}

fn widget_rows(node: &JoinerNode) -> Vec<WidgetRow> {
    let mut rows = Vec::new();
    let mut offset: u16 = 0;
    for widget in node.widgets().iter().filter(|widget| !widget.hidden) {
        let Some(target) = FocusTarget::for_widget(widget) else {
            continue;
        };
        let lines = match target {
            FocusTarget::JoinString => vec![format!(
                "{}: \"{}\"",
                widget.name,
                node.join_string().escape_debug()
            )],
            FocusTarget::Trim => {
                let mark = if node.trim_whitespace() { "x" } else { " " };
                vec![format!("[{mark}] {}", widget.name)]
            }
            FocusTarget::Action(_) => {
                vec![format!("[ {} ]", widget.value.as_text().unwrap_or_default())]
            }
            FocusTarget::Field(slot) => {
                let text = node.field_value(slot).unwrap_or_default();
                let indent = " ".repeat(usize::from(FIELD_INDENT));
                let mut lines = vec![format!("{}:", widget.name)];
                lines.extend(
                    text.split('\n')
                        .take(FIELD_TEXT_LINES)
                        .map(|line| format!("{indent}{line}")),
                );
                lines.resize(FIELD_TEXT_LINES + 1, String::new());
                lines
            }
        };
        let height = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        rows.push(WidgetRow {
            target,
            offset,
            lines,
        });
        offset = offset.saturating_add(height);
    }
    rows
}

/// Screen cell where the first character of a field's text is drawn,
/// ignoring scroll.
fn field_anchor(node: &JoinerNode, slot: SlotIndex) -> Anchor {
    let offset = widget_rows(node)
        .into_iter()
        .find(|row| row.target == FocusTarget::Field(slot))
        .map_or(0, |row| row.offset);
    // Block border, then the label line.
    Anchor::new(
        1 + FOCUS_MARKER_WIDTH + FIELD_INDENT,
        HEADER_ROWS + 1 + offset + 1,
    )
}

fn screen_layout(area: Rect) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_ROWS),
            Constraint::Min(1),
            Constraint::Length(PREVIEW_ROWS),
            Constraint::Length(2),
        ])
        .split(area)
}

/// Rows scrolled off the top of the body so the focused widget stays
/// fully visible.
fn body_scroll(rows: &[WidgetRow], focus: FocusTarget, body: Rect) -> u16 {
    let inner_height = body.height.saturating_sub(2);
    rows.iter()
        .find(|row| row.target == focus)
        .map_or(0, |row| {
            let bottom = row
                .offset
                .saturating_add(u16::try_from(row.lines.len()).unwrap_or(u16::MAX));
            bottom.saturating_sub(inner_height)
        })
}

/// Screen rectangle of the completion popup when it belongs to the node on
/// screen, with the number of candidates it lists.
fn completion_popup(editor: &Editor, area: Rect) -> Option<(Rect, usize)> {
    let node = editor.node()?;
    let binding = editor.session.overlay().binding()?;
    if binding.field.node != node.id() {
        return None;
    }
    let scroll = body_scroll(&widget_rows(node), editor.focus, screen_layout(area)[1]);
    Some((popup_rect(area, binding, scroll), binding.candidates().len()))
}

fn popup_rect(area: Rect, binding: &Binding, scroll: u16) -> Rect {
    let widest = binding
        .candidates()
        .iter()
        .map(|candidate| candidate.chars().count())
        .max()
        .unwrap_or(0);
    let width = u16::try_from(widest + 2)
        .unwrap_or(u16::MAX)
        .max(12)
        .min(area.width);
    let height = u16::try_from(binding.candidates().len() + 2)
        .unwrap_or(u16::MAX)
        .min(area.height);
    let x = binding
        .position
        .column
        .min(area.width.saturating_sub(width));
    let y = binding
        .position
        .row
        .saturating_sub(scroll)
        .min(area.height.saturating_sub(height));
    Rect::new(area.x + x, area.y + y, width, height)
}

fn render(frame: &mut ratatui::Frame<'_>, editor: &Editor) {
    let layout = screen_layout(frame.area());

    let titles = editor
        .nodes
        .iter()
        .map(|node| format!("TextJoiner #{} ({})", node.id().get(), node.field_count()))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("joiner").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(editor.node_index);
    frame.render_widget(tabs, layout[0]);

    let Some(node) = editor.node() else {
        return;
    };

    let rows = widget_rows(node);
    let scroll = body_scroll(&rows, editor.focus, layout[1]);

    let mut lines = Vec::new();
    for row in &rows {
        let focused = row.target == editor.focus;
        for (index, text) in row.lines.iter().enumerate() {
            let marker = if focused && index == 0 { "> " } else { "  " };
            let style = if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            lines.push(Line::styled(format!("{marker}{text}"), style));
        }
    }
    let size = node.size();
    let body = Paragraph::new(lines).scroll((scroll, 0)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("node {} ({}x{})", node.id().get(), size.width, size.height)),
    );
    frame.render_widget(body, layout[1]);

    if let Some(row) = rows.iter().find(|row| row.target == editor.focus)
        && let Some(text) = editor.focused_text()
    {
        let head = &text[..floor_char_boundary(text, editor.cursor)];
        let line = head.matches('\n').count();
        let column = head.rsplit('\n').next().map_or(0, |tail| tail.chars().count());
        let column = u16::try_from(column).unwrap_or(u16::MAX);
        let (x, y) = match row.target {
            FocusTarget::Field(_) if line < FIELD_TEXT_LINES => (
                layout[1].x + 1 + FOCUS_MARKER_WIDTH + FIELD_INDENT + column,
                layout[1].y + 1 + row.offset + 1 + u16::try_from(line).unwrap_or(0),
            ),
            FocusTarget::JoinString => {
                let label = u16::try_from(joiner_app::JOIN_STRING_WIDGET.len() + 3).unwrap_or(0);
                let escaped = u16::try_from(text.escape_debug().count()).unwrap_or(0);
                (
                    layout[1].x + 1 + FOCUS_MARKER_WIDTH + label + escaped,
                    layout[1].y + 1 + row.offset,
                )
            }
            _ => (0, 0),
        };
        if y > scroll && y - scroll < layout[1].y + layout[1].height.saturating_sub(1) && x > 0 {
            frame.set_cursor_position((x, y - scroll));
        }
    }

    let preview = Paragraph::new(node.joined_output())
        .block(Block::default().borders(Borders::ALL).title("joined"));
    frame.render_widget(preview, layout[2]);

    let status = Paragraph::new(status_text(editor))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, layout[3]);

    if let Some(binding) = editor.session.overlay().binding()
        && let Some((popup, _)) = completion_popup(editor, frame.area())
    {
        render_completion_popup(frame, binding, popup);
    }

    if editor.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_completion_popup(frame: &mut ratatui::Frame<'_>, binding: &Binding, popup: Rect) {
    let lines = binding
        .candidates()
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let style = if index == binding.highlight() {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            Line::styled(candidate.clone(), style)
        })
        .collect::<Vec<_>>();

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(binding.span.kind.as_str()),
        ),
        popup,
    );
}

fn status_text(editor: &Editor) -> String {
    if editor.help_visible {
        return String::new();
    }
    let state = if editor.dirty { "modified" } else { "saved" };
    let hints = concat!(
        "up/down focus | pgup/pgdn node | ctrl+a add | ctrl+r remove | ",
        "ctrl+e split | ctrl+s save | F1 help | ctrl+q"
    );
    match &editor.status {
        Some(status) => format!("{state} | {status} | {hints}"),
        None => format!("{state} | {hints}"),
    }
}

fn help_overlay_text() -> String {
    [
        "up/down       move between widgets",
        "pgup/pgdn     previous/next node",
        "enter/space   toggle trim, press buttons",
        "ctrl+a        add text box",
        "ctrl+r        remove last text box",
        "ctrl+e        split focused text box on the join string",
        "ctrl+s        save workflow",
        "__ or /*      start a wildcard or preset completion",
        "up/down       choose a completion",
        "enter/tab     insert completion, esc to dismiss",
        "ctrl+q        quit",
    ]
    .join("\n")
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, Editor, FocusTarget, HeadlessHost, InternalEvent, SavedNode, TuiHost,
        completion_popup, edit_text, field_anchor, handle_key_event, handle_mouse_event,
        process_internal_events, render, restore_node, status_text, widget_rows,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{
        KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };
    use joiner_app::{
        Anchor, FieldChange, JoinerNode, MAX_FIELDS, NodeId, RestoreOutcome, Size, SlotIndex,
        TriggerKind,
    };
    use joiner_testkit::{
        sample_presets, sample_wildcards, saved_values, saved_values_with_payload,
    };
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::layout::Rect;
    use serde_json::json;
    use std::sync::mpsc::{self, Receiver, Sender};

    #[derive(Debug, Default)]
    struct TestRuntime {
        workflow: Vec<SavedNode>,
        saved: Vec<Vec<SavedNode>>,
        fail_save: bool,
        offline: bool,
    }

    impl AppRuntime for TestRuntime {
        fn load_workflow(&mut self) -> Result<Vec<SavedNode>> {
            Ok(self.workflow.clone())
        }

        fn save_workflow(&mut self, nodes: &[SavedNode]) -> Result<()> {
            if self.fail_save {
                return Err(anyhow!("disk full"));
            }
            self.saved.push(nodes.to_vec());
            Ok(())
        }

        fn fetch_candidates(&mut self, kind: TriggerKind) -> Result<Vec<String>> {
            if self.offline {
                return Err(anyhow!("connection refused"));
            }
            Ok(match kind {
                TriggerKind::Wildcard => sample_wildcards(),
                TriggerKind::Preset => sample_presets(),
            })
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn loaded(
        runtime: &mut TestRuntime,
    ) -> (Editor, Sender<InternalEvent>, Receiver<InternalEvent>) {
        let (tx, rx) = mpsc::channel();
        let mut editor = Editor::load(runtime, &tx).expect("editor should load");
        runtime
            .spawn_candidate_fetch(tx.clone())
            .expect("fetch should send");
        process_internal_events(&mut editor, &tx, &rx);
        (editor, tx, rx)
    }

    fn type_text(
        editor: &mut Editor,
        runtime: &mut TestRuntime,
        tx: &Sender<InternalEvent>,
        text: &str,
    ) {
        for ch in text.chars() {
            handle_key_event(editor, runtime, tx, key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn load_restores_saved_fields_and_save_round_trips() {
        let mut runtime = TestRuntime {
            workflow: vec![SavedNode {
                id: NodeId::new(3),
                size: Size::new(60, 10),
                widgets_values: saved_values(", ", true, &["a", "b", "c", "d", "e", "f", "g"]),
            }],
            ..TestRuntime::default()
        };
        let (mut editor, tx, _rx) = loaded(&mut runtime);

        assert_eq!(editor.nodes[0].field_count(), 7);
        assert_eq!(editor.nodes[0].size().width, 60);
        assert_eq!(editor.focus, FocusTarget::Field(SlotIndex::new(0)));

        handle_key_event(&mut editor, &mut runtime, &tx, ctrl('s'));

        assert_eq!(runtime.saved.len(), 1);
        assert_eq!(runtime.saved[0][0].widgets_values, runtime.workflow[0].widgets_values);
        assert!(!editor.dirty);
    }

    #[test]
    fn headless_restore_applies_saved_size_and_reports_fallback() {
        let mut host = HeadlessHost::default();
        let saved = SavedNode {
            id: NodeId::new(4),
            size: Size::new(90, 1),
            widgets_values: saved_values_with_payload(
                " ",
                true,
                &["x", "y", "", "", ""],
                json!("oops"),
            ),
        };

        let (mut node, outcome) = restore_node(&saved, &mut host);

        assert!(matches!(outcome, RestoreOutcome::Fallback(_)));
        assert_eq!(node.size().width, 90);
        assert!(node.size().height > 1);
        assert_eq!(node.joined_output(), "x y");

        while node.field_count() > 1 {
            node.remove_field(&mut host);
        }
        assert!(matches!(node.remove_field(&mut host), FieldChange::Rejected(_)));
        assert_eq!(host.rejections(), ["At least 1 text box is required.".to_owned()]);
    }

    #[test]
    fn empty_workflow_starts_with_one_default_node() {
        let mut runtime = TestRuntime::default();
        let (editor, _tx, _rx) = loaded(&mut runtime);

        assert_eq!(editor.nodes.len(), 1);
        assert_eq!(editor.nodes[0].field_count(), 5);
    }

    #[test]
    fn typing_a_wildcard_marker_opens_completion_and_enter_commits() {
        let mut runtime = TestRuntime::default();
        let (mut editor, tx, _rx) = loaded(&mut runtime);

        type_text(&mut editor, &mut runtime, &tx, "a __sea");
        let binding = editor
            .session
            .overlay()
            .binding()
            .expect("overlay should be visible");
        assert_eq!(binding.candidates(), ["__season__".to_owned()]);

        handle_key_event(&mut editor, &mut runtime, &tx, key(KeyCode::Enter));

        assert_eq!(
            editor.nodes[0].field_value(SlotIndex::new(0)),
            Some("a __season__")
        );
        assert_eq!(editor.cursor, "a __season__".len());
        assert!(!editor.session.overlay().is_visible());
        assert!(editor.dirty);
    }

    #[test]
    fn escape_dismisses_completion_and_enter_then_inserts_newline() {
        let mut runtime = TestRuntime::default();
        let (mut editor, tx, _rx) = loaded(&mut runtime);

        type_text(&mut editor, &mut runtime, &tx, "/* s");
        assert!(editor.session.overlay().is_visible());

        handle_key_event(&mut editor, &mut runtime, &tx, key(KeyCode::Esc));
        assert!(!editor.session.overlay().is_visible());

        handle_key_event(&mut editor, &mut runtime, &tx, key(KeyCode::Backspace));
        handle_key_event(&mut editor, &mut runtime, &tx, key(KeyCode::Char('x')));
        assert!(!editor.session.overlay().is_visible());
        handle_key_event(&mut editor, &mut runtime, &tx, key(KeyCode::Enter));
        assert_eq!(editor.nodes[0].field_value(SlotIndex::new(0)), Some("/* x\n"));
    }

    #[test]
    fn arrow_keys_cycle_completions_while_visible() {
        let mut runtime = TestRuntime::default();
        let (mut editor, tx, _rx) = loaded(&mut runtime);

        type_text(&mut editor, &mut runtime, &tx, "__");
        let count = editor
            .session
            .overlay()
            .binding()
            .map_or(0, |binding| binding.candidates().len());
        assert_eq!(count, sample_wildcards().len());

        handle_key_event(&mut editor, &mut runtime, &tx, key(KeyCode::Up));
        handle_key_event(&mut editor, &mut runtime, &tx, key(KeyCode::Tab));

        let expected = sample_wildcards().last().cloned().unwrap_or_default();
        assert_eq!(
            editor.nodes[0].field_value(SlotIndex::new(0)),
            Some(expected.as_str())
        );
        assert_eq!(editor.focus, FocusTarget::Field(SlotIndex::new(0)));
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn mouse_hover_highlights_and_click_commits() {
        let mut runtime = TestRuntime::default();
        let (mut editor, tx, _rx) = loaded(&mut runtime);
        let screen = Rect::new(0, 0, 80, 40);
        type_text(&mut editor, &mut runtime, &tx, "x __");

        let (popup, count) = completion_popup(&editor, screen).expect("popup should be on screen");
        assert_eq!(count, sample_wildcards().len());
        assert_eq!(popup.y, field_anchor(&editor.nodes[0], SlotIndex::new(0)).row + 1);

        let hover = mouse(MouseEventKind::Moved, popup.x + 1, popup.y + 3);
        handle_mouse_event(&mut editor, screen, hover);
        assert_eq!(
            editor.session.overlay().binding().map(|binding| binding.highlight()),
            Some(2)
        );

        handle_mouse_event(
            &mut editor,
            screen,
            mouse(MouseEventKind::Down(MouseButton::Left), popup.x + 1, popup.y + 2),
        );
        let expected = format!("x {}", sample_wildcards()[1]);
        assert_eq!(
            editor.nodes[0].field_value(SlotIndex::new(0)),
            Some(expected.as_str())
        );
        assert_eq!(editor.cursor, expected.len());
        assert!(!editor.session.overlay().is_visible());
    }

    #[test]
    fn click_outside_popup_dismisses_it() {
        let mut runtime = TestRuntime::default();
        let (mut editor, tx, _rx) = loaded(&mut runtime);
        let screen = Rect::new(0, 0, 80, 40);
        type_text(&mut editor, &mut runtime, &tx, "__");

        let click = mouse(MouseEventKind::Down(MouseButton::Left), 79, 0);
        handle_mouse_event(&mut editor, screen, click);

        assert!(!editor.session.overlay().is_visible());
        assert_eq!(editor.nodes[0].field_value(SlotIndex::new(0)), Some("__"));
    }

    #[test]
    fn offline_candidates_degrade_to_plain_typing() {
        let mut runtime = TestRuntime {
            offline: true,
            ..TestRuntime::default()
        };
        let (mut editor, tx, _rx) = loaded(&mut runtime);

        assert_eq!(editor.status.as_deref(), Some("preset suggestions unavailable"));
        type_text(&mut editor, &mut runtime, &tx, "__co");
        assert!(!editor.session.overlay().is_visible());
        assert_eq!(editor.nodes[0].field_value(SlotIndex::new(0)), Some("__co"));
    }

    #[test]
    fn ctrl_a_at_ceiling_reports_rejection() {
        let values = vec!["x"; MAX_FIELDS];
        let mut runtime = TestRuntime {
            workflow: vec![SavedNode {
                id: NodeId::new(1),
                size: Size::default(),
                widgets_values: saved_values("\n", true, &values),
            }],
            ..TestRuntime::default()
        };
        let (mut editor, tx, _rx) = loaded(&mut runtime);

        handle_key_event(&mut editor, &mut runtime, &tx, ctrl('a'));

        assert_eq!(editor.nodes[0].field_count(), MAX_FIELDS);
        assert_eq!(editor.status.as_deref(), Some("Maximum 25 text boxes reached."));
        assert!(!editor.dirty);
    }

    #[test]
    fn ctrl_r_moves_focus_off_removed_field_and_drops_completion() {
        let mut runtime = TestRuntime::default();
        let (mut editor, tx, _rx) = loaded(&mut runtime);
        editor.set_focus(FocusTarget::Field(SlotIndex::new(4)));
        type_text(&mut editor, &mut runtime, &tx, "__");
        assert!(editor.session.overlay().is_visible());

        handle_key_event(&mut editor, &mut runtime, &tx, ctrl('r'));

        assert_eq!(editor.nodes[0].field_count(), 4);
        assert_eq!(editor.focus, FocusTarget::Field(SlotIndex::new(3)));
        assert!(!editor.session.overlay().is_visible());
        assert_eq!(editor.status.as_deref(), Some("removed text_4"));
    }

    #[test]
    fn action_widgets_respond_to_enter() {
        let mut runtime = TestRuntime::default();
        let (mut editor, tx, _rx) = loaded(&mut runtime);
        editor.set_focus(FocusTarget::Action(joiner_app::ActionKind::AddField));

        handle_key_event(&mut editor, &mut runtime, &tx, key(KeyCode::Enter));
        assert_eq!(editor.nodes[0].field_count(), 6);
        assert_eq!(
            editor.focus,
            FocusTarget::Action(joiner_app::ActionKind::AddField)
        );

        handle_key_event(&mut editor, &mut runtime, &tx, key(KeyCode::Up));
        handle_key_event(&mut editor, &mut runtime, &tx, key(KeyCode::Char(' ')));
        assert!(!editor.nodes[0].trim_whitespace());
    }

    #[test]
    fn ctrl_e_splits_on_join_string() {
        let mut runtime = TestRuntime::default();
        let (mut editor, tx, _rx) = loaded(&mut runtime);
        type_text(&mut editor, &mut runtime, &tx, "one");
        handle_key_event(&mut editor, &mut runtime, &tx, key(KeyCode::Enter));
        type_text(&mut editor, &mut runtime, &tx, "two");

        handle_key_event(&mut editor, &mut runtime, &tx, ctrl('e'));

        assert_eq!(editor.nodes[0].field_value(SlotIndex::new(0)), Some("one"));
        assert_eq!(editor.nodes[0].field_value(SlotIndex::new(1)), Some("two"));
        assert_eq!(editor.status.as_deref(), Some("split into 2 text boxes"));
    }

    #[test]
    fn dirty_quit_needs_confirmation() {
        let mut runtime = TestRuntime::default();
        let (mut editor, tx, _rx) = loaded(&mut runtime);
        type_text(&mut editor, &mut runtime, &tx, "x");

        assert!(!handle_key_event(&mut editor, &mut runtime, &tx, ctrl('q')));
        assert!(handle_key_event(&mut editor, &mut runtime, &tx, ctrl('q')));
    }

    #[test]
    fn failed_save_keeps_dirty_flag() {
        let mut runtime = TestRuntime {
            fail_save: true,
            ..TestRuntime::default()
        };
        let (mut editor, tx, _rx) = loaded(&mut runtime);
        type_text(&mut editor, &mut runtime, &tx, "x");

        handle_key_event(&mut editor, &mut runtime, &tx, ctrl('s'));

        assert!(editor.dirty);
        assert!(status_text(&editor).contains("save failed: disk full"));
    }

    #[test]
    fn deferred_reorder_event_targets_matching_node() {
        let (tx, rx) = mpsc::channel();
        let mut host = TuiHost::new(tx.clone());
        let node = JoinerNode::create(NodeId::new(8), &mut host);
        let mut editor = Editor::new(vec![node], host);
        let before = editor.nodes[0].clone();

        tx.send(InternalEvent::DeferredReorder { node: NodeId::new(8) })
            .expect("send should succeed");
        tx.send(InternalEvent::DeferredReorder { node: NodeId::new(99) })
            .expect("send should succeed");
        process_internal_events(&mut editor, &tx, &rx);

        assert_eq!(editor.nodes[0], before);
    }

    #[test]
    fn field_anchor_tracks_widget_rows() {
        let (tx, _rx) = mpsc::channel();
        let mut host = TuiHost::new(tx);
        let node = JoinerNode::create(NodeId::new(1), &mut host);

        let rows = widget_rows(&node);
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[4].target, FocusTarget::Field(SlotIndex::new(0)));
        assert_eq!(field_anchor(&node, SlotIndex::new(0)), Anchor::new(7, 3 + 1 + 4 + 1));
        assert_eq!(field_anchor(&node, SlotIndex::new(1)), Anchor::new(7, 3 + 1 + 8 + 1));
    }

    #[test]
    fn edit_text_respects_char_boundaries() {
        let mut text = "aé".to_owned();
        let mut cursor = text.len();

        assert!(edit_text(&mut text, &mut cursor, key(KeyCode::Backspace)));
        assert_eq!((text.as_str(), cursor), ("a", 1));
        assert!(!edit_text(&mut text, &mut cursor, key(KeyCode::Left)));
        assert!(edit_text(&mut text, &mut cursor, key(KeyCode::Char('ü'))));
        assert_eq!((text.as_str(), cursor), ("üa", 2));
        assert!(edit_text(&mut text, &mut cursor, key(KeyCode::Delete)));
        assert_eq!(text, "ü");
    }

    #[test]
    fn render_shows_fields_preview_and_popup() -> Result<()> {
        let mut runtime = TestRuntime::default();
        let (mut editor, tx, _rx) = loaded(&mut runtime);
        type_text(&mut editor, &mut runtime, &tx, "__col");

        let mut terminal = Terminal::new(TestBackend::new(80, 40))?;
        terminal.draw(|frame| render(frame, &editor))?;

        let screen = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(screen.contains("TextJoiner #1 (5)"));
        assert!(screen.contains("text_0:"));
        assert!(screen.contains("__colors__"));
        assert!(screen.contains("joined"));
        Ok(())
    }
}
