use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use pum_core::{CompleteOption, Config, Documentation, InsertChange, Item, PopupChangeEvent, RecencyMap};
use pum_event::TaskHandle;

use crate::bridge::{EditorBridge, EditorCommand, EditorEvent, EditorKind, FloatBounds, FloatingWindow};
use crate::coordinator::Coordinator;
use crate::source::{Source, SourceReply};

// ---- test doubles ------------------------------------------------------

#[derive(Default)]
struct TestBridge {
    commands: Mutex<Vec<EditorCommand>>,
    option: Mutex<Option<CompleteOption>>,
    pretext: Mutex<String>,
    pum_visible: AtomicBool,
    fail_notify: AtomicBool,
}

impl TestBridge {
    fn set_option(&self, option: CompleteOption) {
        *self.option.lock() = Some(option);
    }

    fn set_pretext(&self, pre: &str) {
        *self.pretext.lock() = pre.to_string();
    }

    fn commands(&self) -> Vec<EditorCommand> {
        self.commands.lock().clone()
    }

    fn popup_shows(&self) -> Vec<(u32, Vec<Item>, i64)> {
        self.commands
            .lock()
            .iter()
            .filter_map(|command| match command {
                EditorCommand::PopupShow { col, rows, preselect } => {
                    Some((*col, rows.clone(), *preselect))
                }
                _ => None,
            })
            .collect()
    }

    fn shown_words(&self) -> Vec<Vec<String>> {
        self.popup_shows()
            .into_iter()
            .map(|(_, rows, _)| rows.into_iter().map(|item| item.word).collect())
            .collect()
    }

    fn contains(&self, command: &EditorCommand) -> bool {
        self.commands.lock().iter().any(|seen| seen == command)
    }
}

impl EditorBridge for TestBridge {
    fn notify(&self, batch: Vec<EditorCommand>) -> anyhow::Result<()> {
        if self.fail_notify.load(Ordering::Relaxed) {
            anyhow::bail!("editor went away");
        }
        self.commands.lock().extend(batch);
        Ok(())
    }

    fn get_complete_option(&self) -> BoxFuture<'static, anyhow::Result<Option<CompleteOption>>> {
        let option = self.option.lock().clone();
        async move { Ok(option) }.boxed()
    }

    fn pretext(&self) -> BoxFuture<'static, anyhow::Result<String>> {
        let pre = self.pretext.lock().clone();
        async move { Ok(pre) }.boxed()
    }

    fn pum_visible(&self) -> BoxFuture<'static, anyhow::Result<bool>> {
        let visible = self.pum_visible.load(Ordering::Relaxed);
        async move { Ok(visible) }.boxed()
    }
}

#[derive(Default)]
struct TestFloat {
    shows: Mutex<Vec<Vec<Documentation>>>,
    closed: AtomicUsize,
}

impl FloatingWindow for TestFloat {
    fn show(
        &self,
        docs: Vec<Documentation>,
        _bounds: FloatBounds,
        _handle: TaskHandle,
    ) -> anyhow::Result<()> {
        self.shows.lock().push(docs);
        Ok(())
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }
}

struct TestSource {
    name: String,
    items: Vec<Item>,
    priority: i32,
    is_incomplete: bool,
    triggers: Vec<String>,
    commit_chars: Vec<char>,
    delay: Duration,
    fail: bool,
    calls: AtomicUsize,
}

impl TestSource {
    fn new(name: &str, words: &[&str]) -> TestSource {
        TestSource {
            name: name.to_string(),
            items: words.iter().map(|word| Item::new(*word)).collect(),
            priority: 0,
            is_incomplete: false,
            triggers: Vec::new(),
            commit_chars: Vec::new(),
            delay: Duration::ZERO,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> TestSource {
        self.delay = delay;
        self
    }

    fn with_items(mut self, items: Vec<Item>) -> TestSource {
        self.items = items;
        self
    }

    fn with_triggers(mut self, triggers: &[&str]) -> TestSource {
        self.triggers = triggers.iter().map(|t| t.to_string()).collect();
        self
    }

    fn with_commit_chars(mut self, chars: &[char]) -> TestSource {
        self.commit_chars = chars.to_vec();
        self
    }

    fn incomplete(mut self) -> TestSource {
        self.is_incomplete = true;
        self
    }

    fn failing(mut self) -> TestSource {
        self.fail = true;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Source for TestSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn triggers(&self, _filetype: &str) -> Vec<String> {
        self.triggers.clone()
    }

    fn do_complete(
        &self,
        option: &CompleteOption,
        _recency: &Arc<RecencyMap>,
        _handle: TaskHandle,
    ) -> BoxFuture<'static, anyhow::Result<SourceReply>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let input = option.input.clone();
        let items = self.items.clone();
        let delay = self.delay;
        let fail = self.fail;
        let is_incomplete = self.is_incomplete;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if fail {
                anyhow::bail!("source exploded");
            }
            let items = items
                .into_iter()
                .filter(|item| item.word.starts_with(&input))
                .collect();
            Ok(SourceReply {
                items,
                is_incomplete,
            })
        }
        .boxed()
    }

    fn should_commit(&self, _item: &Item, ch: char) -> bool {
        self.commit_chars.contains(&ch)
    }
}

// ---- fixture -----------------------------------------------------------

struct Fixture {
    coord: Coordinator,
    bridge: Arc<TestBridge>,
    float: Arc<TestFloat>,
}

fn fixture(config: Config, sources: Vec<Arc<dyn Source>>) -> Fixture {
    let bridge = Arc::new(TestBridge::default());
    let float = Arc::new(TestFloat::default());
    let mut coord = Coordinator::new(
        bridge.clone(),
        float.clone(),
        EditorKind::Native,
        Arc::new(ArcSwap::from_pointee(config)),
        sources,
    );
    coord.set_filetype(1, "rust");
    Fixture { coord, bridge, float }
}

fn option_on(line: &str, input: &str, col: u32, colnr: u32) -> CompleteOption {
    CompleteOption {
        bufnr: 1,
        linenr: 1,
        col,
        colnr,
        line: line.to_string(),
        filetype: "rust".to_string(),
        input: input.to_string(),
        trigger_character: None,
        blacklist: Vec::new(),
        source: None,
        uri: None,
    }
}

fn insert(pre: &str, col: u32, changedtick: u64) -> InsertChange {
    InsertChange {
        bufnr: 1,
        lnum: 1,
        col,
        pre: pre.to_string(),
        changedtick,
    }
}

fn selection_of(item: Item) -> PopupChangeEvent {
    PopupChangeEvent {
        completed_item: Some(item),
        col: 1,
        row: 2,
        height: 5,
        width: 20,
        scrollbar: false,
    }
}

/// Let spawned work (fan-out grace window, resolver debounce, post-commit
/// settle) run out and apply its dispatched continuations.
async fn settle(coord: &mut Coordinator) {
    for _ in 0..8 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        coord.drain_jobs();
    }
}

/// Start a plain word session: user types `f` on an empty line.
async fn start_word_session(fx: &mut Fixture) {
    fx.bridge.set_option(option_on("f", "f", 0, 2));
    fx.coord.handle_event(EditorEvent::InsertCharPre('f')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedI(1, insert("f", 2, 10)))
        .await;
    settle(&mut fx.coord).await;
}

// ---- end-to-end scenarios ----------------------------------------------

#[tokio::test(start_paused = true)]
async fn plain_word_trigger_starts_a_session() {
    let source = Arc::new(TestSource::new("words", &["foo", "fizz", "bar"]));
    let mut fx = fixture(Config::default(), vec![source.clone()]);
    start_word_session(&mut fx).await;

    assert!(fx.coord.is_active());
    assert_eq!(fx.coord.session.as_ref().unwrap().input, "f");
    assert!(fx
        .bridge
        .contains(&EditorCommand::SetCompleteopt("noselect,noinsert,menuone".into())));
    let shows = fx.bridge.shown_words();
    assert_eq!(shows, vec![vec!["foo".to_string(), "fizz".to_string()]]);
    // anchored at the byte column the word starts on, 1-based
    assert_eq!(fx.bridge.popup_shows()[0].0, 1);
}

#[tokio::test(start_paused = true)]
async fn extending_the_word_narrows_without_a_new_query() {
    let source = Arc::new(TestSource::new("words", &["foo", "fizz"]));
    let mut fx = fixture(Config::default(), vec![source.clone()]);
    start_word_session(&mut fx).await;
    assert_eq!(source.calls(), 1);

    fx.coord.handle_event(EditorEvent::InsertCharPre('o')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedP(1, insert("fo", 3, 11)))
        .await;

    assert_eq!(fx.coord.session.as_ref().unwrap().input, "fo");
    assert_eq!(source.calls(), 1);
    let shows = fx.bridge.shown_words();
    assert_eq!(shows.last().unwrap(), &vec!["foo".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn whitespace_cancels_the_session() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    start_word_session(&mut fx).await;

    fx.coord.handle_event(EditorEvent::InsertCharPre(' ')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedP(1, insert("f ", 3, 11)))
        .await;

    assert!(!fx.coord.is_active());
    assert!(fx.bridge.contains(&EditorCommand::PopupHide));
}

#[tokio::test(start_paused = true)]
async fn indent_change_cancels_the_session() {
    let source = Arc::new(TestSource::new("words", &["foobar"]));
    let mut fx = fixture(Config::default(), vec![source]);
    fx.bridge.set_option(option_on("  foo", "foo", 2, 6));
    fx.coord.handle_event(EditorEvent::InsertCharPre('o')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedI(1, insert("  foo", 6, 10)))
        .await;
    settle(&mut fx.coord).await;
    assert!(fx.coord.is_active());

    fx.coord
        .handle_event(EditorEvent::TextChangedP(1, insert("    foo", 8, 11)))
        .await;
    assert!(!fx.coord.is_active());
}

#[tokio::test(start_paused = true)]
async fn self_induced_change_is_ignored() {
    let source = Arc::new(TestSource::new("words", &["foo", "fizz"]));
    let mut fx = fixture(Config::default(), vec![source]);
    start_word_session(&mut fx).await;

    let session_tick = fx.coord.session.as_ref().unwrap().changed_tick.unwrap();
    let shows_before = fx.bridge.popup_shows().len();

    // the popup inserting "foo" fires a text-changed bearing the tick the
    // popup was painted under
    fx.coord
        .handle_event(EditorEvent::TextChangedP(1, insert("foo", 4, session_tick)))
        .await;

    assert!(fx.coord.is_active());
    assert_eq!(fx.coord.session.as_ref().unwrap().input, "f");
    assert_eq!(fx.bridge.popup_shows().len(), shows_before);
    // but the pretext tracked the editor
    assert_eq!(fx.coord.pretext, "foo");
}

#[tokio::test(start_paused = true)]
async fn commit_character_accepts_the_highlighted_item() {
    let mut config = Config::default();
    config.accept_suggestion_on_commit_character = true;
    let source = Arc::new(TestSource::new("words", &["foo"]).with_commit_chars(&['.']));
    let mut fx = fixture(config, vec![source]);
    start_word_session(&mut fx).await;

    let row = fx.bridge.popup_shows()[0].1[0].clone();
    fx.coord
        .handle_event(EditorEvent::MenuPopupChanged(selection_of(row)))
        .await;

    fx.coord.handle_event(EditorEvent::InsertCharPre('.')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedI(1, insert("foo.", 5, 12)))
        .await;

    assert!(!fx.coord.is_active());
    assert!(fx.bridge.contains(&EditorCommand::SetLine {
        lnum: 1,
        text: "foo.".to_string(),
    }));
    assert!(fx.bridge.contains(&EditorCommand::MoveCursor { lnum: 1, col: 5 }));
}

// ---- invariants --------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_clears_everything() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    start_word_session(&mut fx).await;

    let row = fx.bridge.popup_shows()[0].1[0].clone();
    fx.coord
        .handle_event(EditorEvent::MenuPopupChanged(selection_of(row)))
        .await;

    fx.coord.stop();
    assert!(!fx.coord.is_active());
    assert!(fx.coord.current_item.is_none());
    let commands = fx.bridge.commands().len();
    fx.coord.stop();
    assert_eq!(fx.bridge.commands().len(), commands);
}

#[tokio::test(start_paused = true)]
async fn insert_leave_returns_to_idle() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    start_word_session(&mut fx).await;

    fx.coord.handle_event(EditorEvent::InsertLeave).await;
    assert!(!fx.coord.is_active());
    assert!(fx.bridge.contains(&EditorCommand::PopupHide));
}

#[tokio::test(start_paused = true)]
async fn trigger_character_restarts_the_live_session() {
    let source = Arc::new(TestSource::new("fields", &["foo", "foobar"]).with_triggers(&["."]));
    let mut fx = fixture(Config::default(), vec![source.clone()]);
    start_word_session(&mut fx).await;
    let first_generation = fx.coord.session.as_ref().unwrap().generation;

    fx.bridge.set_option(option_on("f.", "", 2, 3));
    fx.coord.handle_event(EditorEvent::InsertCharPre('.')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedP(1, insert("f.", 3, 11)))
        .await;
    settle(&mut fx.coord).await;

    assert!(fx.coord.is_active());
    assert!(fx.coord.session.as_ref().unwrap().generation > first_generation);
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn cursor_at_session_start_column_stops() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    start_word_session(&mut fx).await;

    // cursor column equal to the session start column counts as "moved
    // before the start", deliberately so
    fx.coord
        .handle_event(EditorEvent::TextChangedI(1, insert("x", 1, 11)))
        .await;
    assert!(!fx.coord.is_active());
}

// ---- fan-out behavior --------------------------------------------------

#[tokio::test(start_paused = true)]
async fn slow_sources_time_out_and_the_rest_survive() {
    let mut config = Config::default();
    config.timeout = 50;
    let fast = Arc::new(TestSource::new("fast", &["fast"]));
    let slow =
        Arc::new(TestSource::new("slow", &["faraway"]).with_delay(Duration::from_millis(200)));
    let mut fx = fixture(config, vec![fast, slow]);
    start_word_session(&mut fx).await;

    assert!(fx.coord.is_active());
    let session = fx.coord.session.as_ref().unwrap();
    assert!(!session.is_completing());
    let words = fx.bridge.shown_words();
    assert!(words.iter().all(|rows| !rows.contains(&"faraway".to_string())));
    assert_eq!(words.last().unwrap(), &vec!["fast".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn failing_source_is_dropped_others_continue() {
    let good = Arc::new(TestSource::new("good", &["foo"]));
    let bad = Arc::new(TestSource::new("bad", &["fob"]).failing());
    let mut fx = fixture(Config::default(), vec![good, bad]);
    start_word_session(&mut fx).await;

    assert!(fx.coord.is_active());
    assert_eq!(fx.bridge.shown_words().last().unwrap(), &vec!["foo".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn all_sources_failing_stops_the_session() {
    let bad = Arc::new(TestSource::new("bad", &["foo"]).failing());
    let mut fx = fixture(Config::default(), vec![bad]);
    start_word_session(&mut fx).await;

    assert!(!fx.coord.is_active());
    assert!(fx.bridge.popup_shows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn incomplete_sources_are_requeried_on_extension() {
    let source = Arc::new(TestSource::new("lsp", &["foo", "fob"]).incomplete());
    let mut fx = fixture(Config::default(), vec![source.clone()]);
    start_word_session(&mut fx).await;
    assert_eq!(source.calls(), 1);

    fx.coord.handle_event(EditorEvent::InsertCharPre('o')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedP(1, insert("fo", 3, 11)))
        .await;
    settle(&mut fx.coord).await;

    assert_eq!(source.calls(), 2);
    assert_eq!(fx.bridge.shown_words().last().unwrap(), &vec!["foo".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn blacklisted_input_stops_the_session() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    let mut option = option_on("f", "f", 0, 2);
    option.blacklist = vec!["fo".to_string()];
    fx.bridge.set_option(option);
    fx.coord.handle_event(EditorEvent::InsertCharPre('f')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedI(1, insert("f", 2, 10)))
        .await;
    settle(&mut fx.coord).await;
    assert!(fx.coord.is_active());

    fx.coord.handle_event(EditorEvent::InsertCharPre('o')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedP(1, insert("fo", 3, 11)))
        .await;
    assert!(!fx.coord.is_active());
}

#[tokio::test(start_paused = true)]
async fn losing_the_original_prefix_stops_the_session() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    start_word_session(&mut fx).await;

    fx.coord.handle_event(EditorEvent::InsertCharPre('g')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedP(1, insert("g", 2, 11)))
        .await;
    assert!(!fx.coord.is_active());
}

// ---- selection, resolve and commit -------------------------------------

#[tokio::test(start_paused = true)]
async fn selection_resolves_docs_into_the_float() {
    let mut with_info = Item::new("foo");
    with_info.info = "fn foo() -> u32".to_string();
    let source = Arc::new(TestSource::new("lsp", &[]).with_items(vec![with_info]));
    let mut fx = fixture(Config::default(), vec![source]);
    start_word_session(&mut fx).await;

    let row = fx.bridge.popup_shows()[0].1[0].clone();
    fx.coord
        .handle_event(EditorEvent::MenuPopupChanged(selection_of(row)))
        .await;
    settle(&mut fx.coord).await;

    let shows = fx.float.shows.lock().clone();
    assert_eq!(shows.len(), 1);
    assert_eq!(shows[0][0].filetype, "rust");
}

#[tokio::test(start_paused = true)]
async fn complete_done_records_recency_and_stops() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    start_word_session(&mut fx).await;

    let row = fx.bridge.popup_shows()[0].1[0].clone();
    let session_tick = fx.coord.session.as_ref().unwrap().changed_tick.unwrap();
    // the editor inserts the word, then reports the done item
    fx.coord
        .handle_event(EditorEvent::TextChangedP(1, insert("foo", 4, session_tick)))
        .await;
    fx.coord
        .handle_event(EditorEvent::CompleteDone(Some(row)))
        .await;
    settle(&mut fx.coord).await;

    assert!(!fx.coord.is_active());
    assert!(fx.coord.recency.last_seen(1, "foo").is_some());
}

#[tokio::test(start_paused = true)]
async fn interrupted_commit_skips_the_recency_record() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    start_word_session(&mut fx).await;

    let row = fx.bridge.popup_shows()[0].1[0].clone();
    fx.coord
        .handle_event(EditorEvent::CompleteDone(Some(row)))
        .await;
    // a keystroke lands inside the settle window
    fx.coord.handle_event(EditorEvent::InsertCharPre('x')).await;
    settle(&mut fx.coord).await;

    assert!(!fx.coord.is_active());
    assert!(fx.coord.recency.last_seen(1, "foo").is_none());
}

// ---- config driven behavior --------------------------------------------

#[tokio::test(start_paused = true)]
async fn number_select_maps_and_unmaps() {
    let mut config = Config::default();
    config.number_select = true;
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(config, vec![source]);
    start_word_session(&mut fx).await;

    assert!(fx.bridge.contains(&EditorCommand::MapNumberSelect));
    assert_eq!(fx.bridge.popup_shows()[0].1[0].abbr, "1 foo");

    fx.coord.stop();
    assert!(fx.bridge.contains(&EditorCommand::UnmapNumberSelect));
}

#[tokio::test(start_paused = true)]
async fn config_reload_does_not_restart_the_session() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    start_word_session(&mut fx).await;
    let generation = fx.coord.session.as_ref().unwrap().generation;

    let mut reloaded = Config::default();
    reloaded.max_item_count = 5;
    fx.coord
        .handle_event(EditorEvent::ConfigChanged(reloaded))
        .await;

    assert!(fx.coord.is_active());
    assert_eq!(fx.coord.session.as_ref().unwrap().generation, generation);
}

#[tokio::test(start_paused = true)]
async fn unknown_manual_source_reports_a_single_line_error() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    fx.bridge.set_option(option_on("f", "f", 0, 2));

    fx.coord.manual_trigger(Some("nope".to_string())).await;

    assert!(!fx.coord.is_active());
    assert!(fx.bridge.commands().iter().any(|command| matches!(
        command,
        EditorCommand::EchoError(msg) if msg.starts_with("Complete error:")
    )));
}

#[tokio::test(start_paused = true)]
async fn broken_editor_rpc_never_leaves_a_session_behind() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    fx.bridge.fail_notify.store(true, Ordering::Relaxed);
    fx.bridge.set_option(option_on("f", "f", 0, 2));

    fx.coord.handle_event(EditorEvent::InsertCharPre('f')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedI(1, insert("f", 2, 10)))
        .await;
    settle(&mut fx.coord).await;

    assert!(!fx.coord.is_active());
    assert!(fx.bridge.popup_shows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn insert_enter_probes_when_configured() {
    let mut config = Config::default();
    config.trigger_after_insert_enter = true;
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(config, vec![source]);
    fx.bridge.set_option(option_on("f", "f", 0, 2));
    fx.bridge.set_pretext("f");

    fx.coord.handle_event(EditorEvent::InsertEnter(1)).await;
    settle(&mut fx.coord).await;

    assert!(fx.coord.is_active());
    assert!(!fx.bridge.popup_shows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn command_line_buffers_never_get_a_popup() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    let mut option = option_on("f", "f", 0, 2);
    option.uri = Some("output:///foo%5BCommand%20Line%5D".to_string());
    fx.bridge.set_option(option);

    fx.coord.handle_event(EditorEvent::InsertCharPre('f')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedI(1, insert("f", 2, 10)))
        .await;
    settle(&mut fx.coord).await;

    assert!(!fx.coord.is_active());
    assert!(fx.bridge.popup_shows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn foreign_popup_suppresses_the_trigger() {
    let source = Arc::new(TestSource::new("words", &["foo"]));
    let mut fx = fixture(Config::default(), vec![source]);
    fx.bridge.pum_visible.store(true, Ordering::Relaxed);
    fx.bridge.set_option(option_on("f", "f", 0, 2));

    fx.coord.handle_event(EditorEvent::InsertCharPre('f')).await;
    fx.coord
        .handle_event(EditorEvent::TextChangedI(1, insert("f", 2, 10)))
        .await;

    assert!(!fx.coord.is_active());
}
