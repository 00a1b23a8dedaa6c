//! The top-level state machine: the only externally visible surface of
//! the engine.
//!
//! The coordinator is either idle or owns exactly one [`Session`].
//! Everything it knows arrives as an [`EditorEvent`]; everything it does
//! leaves as a batch of [`EditorCommand`]s. Spawned work (source fan-out,
//! resolve, post-commit settle) never touches state directly: it captures
//! witnesses (session generation, change counter, keystroke timestamps),
//! runs, and reports back through the job queue where the witnesses are
//! checked before anything is painted. A stale continuation is simply
//! dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use pum_core::chars::char_is_whitespace;
use pum_core::recency::epoch_ms;
use pum_core::{
    get_resume_input, AutoTrigger, CompleteOption, Config, InsertChange, Item, LastInsert,
    PopupChangeEvent, RecencyMap, WordSet,
};
use pum_event::{send_blocking, AsyncHook, TaskHandle};
use tokio::sync::mpsc::{Sender, UnboundedReceiver};

use crate::bridge::{EditorBridge, EditorCommand, EditorEvent, EditorKind, FloatBounds, FloatingWindow};
use crate::error::{Error, Result};
use crate::filter;
use crate::job::{job_queue, Dispatcher, Job};
use crate::popup;
use crate::resolve::{docs_for, ResolveEvent, ResolveHandler, ResolveRequest};
use crate::session::{completeopt, spawn_fan_out, Session};
use crate::source::{Source, SourceReply};
use crate::trigger;

/// The item currently highlighted in the popup, with the source that
/// produced it.
pub(crate) struct CurrentItem {
    pub source: Arc<dyn Source>,
    pub item: Item,
}

pub struct Coordinator {
    bridge: Arc<dyn EditorBridge>,
    pub(crate) floating: Arc<dyn FloatingWindow>,
    config: Arc<ArcSwap<Config>>,
    pub(crate) recency: Arc<RecencyMap>,
    sources: Vec<Arc<dyn Source>>,
    word_sets: HashMap<String, WordSet>,
    default_words: WordSet,
    filetypes: HashMap<u64, String>,

    // shared across idle and active states
    pub(crate) pretext: String,
    last_insert: Option<LastInsert>,
    pub(crate) insert_char_at: Option<Instant>,
    pub(crate) insert_leave_at: Option<Instant>,
    /// Latest change counter observed on any text-changed event.
    pub(crate) changedtick: u64,

    pub(crate) session: Option<Session>,
    generation: u64,
    pub(crate) current_item: Option<CurrentItem>,

    resolver: Sender<ResolveEvent>,
    dispatcher: Dispatcher,
    jobs: UnboundedReceiver<Job>,
}

impl Coordinator {
    /// Must run inside a tokio runtime: the resolver task spawns here.
    pub fn new(
        bridge: Arc<dyn EditorBridge>,
        floating: Arc<dyn FloatingWindow>,
        kind: EditorKind,
        config: Arc<ArcSwap<Config>>,
        sources: Vec<Arc<dyn Source>>,
    ) -> Coordinator {
        let (dispatcher, jobs) = job_queue();
        let resolver =
            ResolveHandler::new(floating.clone(), dispatcher.clone(), kind.selection_debounce())
                .spawn();
        Coordinator {
            bridge,
            floating,
            config,
            recency: Arc::new(RecencyMap::new()),
            sources,
            word_sets: HashMap::new(),
            default_words: WordSet::default(),
            filetypes: HashMap::new(),
            pretext: String::new(),
            last_insert: None,
            insert_char_at: None,
            insert_leave_at: None,
            changedtick: 0,
            session: None,
            generation: 0,
            current_item: None,
            resolver,
            dispatcher,
            jobs,
        }
    }

    /// Buffer metadata the events themselves do not carry.
    pub fn set_filetype(&mut self, bufnr: u64, filetype: impl Into<String>) {
        self.filetypes.insert(bufnr, filetype.into());
    }

    /// Override the word-character table for one filetype.
    pub fn set_word_set(&mut self, filetype: impl Into<String>, words: WordSet) {
        self.word_sets.insert(filetype.into(), words);
    }

    pub fn recency(&self) -> Arc<RecencyMap> {
        self.recency.clone()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Process events and dispatched continuations until both channels
    /// close.
    pub async fn run(&mut self, mut events: UnboundedReceiver<EditorEvent>) {
        enum Tick {
            Job(Job),
            Event(EditorEvent),
        }
        loop {
            let tick = tokio::select! {
                biased;
                job = self.jobs.recv() => match job {
                    Some(job) => Tick::Job(job),
                    None => break,
                },
                event = events.recv() => match event {
                    Some(event) => Tick::Event(event),
                    None => break,
                },
            };
            match tick {
                Tick::Job(job) => job(self),
                Tick::Event(event) => self.handle_event(event).await,
            }
        }
    }

    /// Run every continuation spawned tasks have queued so far.
    pub fn drain_jobs(&mut self) {
        while let Ok(job) = self.jobs.try_recv() {
            job(self);
        }
    }

    pub async fn handle_event(&mut self, event: EditorEvent) {
        match event {
            EditorEvent::InsertCharPre(ch) => {
                self.last_insert = Some(LastInsert::now(ch));
                self.insert_char_at = Some(Instant::now());
            }
            EditorEvent::InsertEnter(bufnr) => {
                let config = self.config.load_full();
                if config.trigger_after_insert_enter && config.auto_trigger == AutoTrigger::Always {
                    self.probe_trigger(bufnr).await;
                }
            }
            EditorEvent::InsertLeave => {
                self.insert_leave_at = Some(Instant::now());
                self.stop();
            }
            EditorEvent::TextChangedI(bufnr, info) => self.on_user_edit(bufnr, info).await,
            EditorEvent::TextChangedP(bufnr, info) => self.on_popup_edit(bufnr, info).await,
            EditorEvent::CompleteDone(item) => self.on_complete_done(item),
            EditorEvent::MenuPopupChanged(ev) => self.on_selection(ev),
            EditorEvent::ConfigChanged(config) => self.config.store(Arc::new(config)),
        }
    }

    /// Start a session right now, skipping the trigger policy. With a
    /// source name only that source is queried.
    pub async fn manual_trigger(&mut self, source: Option<String>) {
        match self.bridge.get_complete_option().await {
            Ok(Some(mut option)) => {
                option.source = source;
                self.start_or_report(option).await;
            }
            Ok(None) => {}
            Err(err) => log::error!("get_complete_option failed: {err:#}"),
        }
    }

    // ---- input classification ------------------------------------------

    /// The recorded keystroke, consumed, iff it is fresh enough to be the
    /// cause of the event being handled.
    fn take_fresh_insert(&mut self) -> Option<char> {
        let insert = self.last_insert.take()?;
        insert.is_fresh(Instant::now()).then_some(insert.character)
    }

    fn filetype(&self, bufnr: u64) -> String {
        self.filetypes.get(&bufnr).cloned().unwrap_or_default()
    }

    fn word_set(&self, filetype: &str) -> &WordSet {
        self.word_sets.get(filetype).unwrap_or(&self.default_words)
    }

    fn trigger_matches(&self, pre: &str, filetype: &str) -> bool {
        let config = self.config.load_full();
        trigger::should_trigger(
            pre,
            filetype,
            &config,
            &self.sources,
            self.session.is_some(),
            self.word_set(filetype),
        )
    }

    // ---- event handlers ------------------------------------------------

    async fn on_user_edit(&mut self, bufnr: u64, info: InsertChange) {
        self.changedtick = info.changedtick;
        let fresh = self.take_fresh_insert();
        self.pretext = info.pre.clone();
        let filetype = self.filetype(bufnr);

        let Some((linenr, col)) = self
            .session
            .as_ref()
            .map(|session| (session.option.linenr, session.option.col))
        else {
            // idle: only user keystrokes may start a session
            if fresh.is_none() {
                return;
            }
            if self.trigger_matches(&info.pre, &filetype) {
                self.trigger_completion().await;
            }
            return;
        };

        // cursor left the session's line, or sits at or before its start
        if info.lnum != linenr || col >= info.col.saturating_sub(1) {
            if self.trigger_matches(&info.pre, &filetype) {
                self.trigger_completion().await;
            } else {
                self.stop();
            }
            return;
        }

        let config = self.config.load_full();
        if config.accept_suggestion_on_commit_character {
            if let Some(ch) = fresh {
                let commits = info.pre.ends_with(ch)
                    && self
                        .current_item
                        .as_ref()
                        .is_some_and(|current| current.source.should_commit(&current.item, ch));
                if commits {
                    self.accept_by_commit_char(ch);
                    return;
                }
            }
        }

        if self.trigger_matches(&info.pre, &filetype) {
            self.trigger_completion().await;
            return;
        }
        self.resume_completion(false);
    }

    async fn on_popup_edit(&mut self, bufnr: u64, info: InsertChange) {
        self.changedtick = info.changedtick;
        let Some((session_tick, session_indent)) = self
            .session
            .as_ref()
            .map(|session| (session.changed_tick, leading_whitespace(&session.option.line).to_string()))
        else {
            self.pretext = info.pre;
            return;
        };
        self.pretext = info.pre.clone();

        // the popup inserted this text itself
        if session_tick == Some(info.changedtick) {
            return;
        }
        // indentation changed under the session, no way to reason about
        // the prefix anymore
        if leading_whitespace(&info.pre) != session_indent {
            self.stop();
            return;
        }
        if self.take_fresh_insert().is_none() {
            return;
        }
        let filetype = self.filetype(bufnr);
        if self.trigger_matches(&info.pre, &filetype) {
            self.trigger_completion().await;
            return;
        }
        self.resume_completion(false);
    }

    fn on_selection(&mut self, ev: PopupChangeEvent) {
        let Some(session) = &self.session else {
            return;
        };
        let generation = session.generation;
        let filetype = session.option.filetype.clone();
        let current = ev
            .completed_item
            .as_ref()
            .filter(|item| !item.word.is_empty())
            .and_then(|item| {
                session
                    .shown
                    .iter()
                    .find(|(_, row)| row_matches(row, item))
                    .map(|(idx, row)| CurrentItem {
                        source: session.sources[*idx].clone(),
                        item: row.clone(),
                    })
            });
        let request = current.as_ref().map(|current| ResolveRequest {
            generation,
            source: current.source.clone(),
            item: current.item.clone(),
            bounds: FloatBounds::from(&ev),
            filetype,
        });
        self.current_item = current;
        send_blocking(&self.resolver, ResolveEvent::Selection(request));
    }

    fn on_complete_done(&mut self, done: Option<Item>) {
        if self.session.is_none() {
            return;
        }
        self.current_item = None;
        send_blocking(&self.resolver, ResolveEvent::Cancel);
        self.floating.close();

        let committed = done.filter(|item| !item.word.is_empty());
        let Some(done_item) = committed else {
            self.stop();
            return;
        };
        let found = self.session.as_ref().and_then(|session| {
            session
                .shown
                .iter()
                .find(|(_, row)| row_matches(row, &done_item))
                .map(|(idx, _)| {
                    (
                        session.generation,
                        session.sources[*idx].clone(),
                        session.option.clone(),
                        session.controller.handle(),
                    )
                })
        });
        let Some((generation, source, option, handle)) = found else {
            self.stop();
            return;
        };

        let config = self.config.load_full();
        let wait = Duration::from_millis(config.post_commit_wait);
        let insert_char_at = self.insert_char_at;
        let insert_leave_at = self.insert_leave_at;
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            let resolved = match handle.cancelable(source.resolve(&done_item, handle.clone())).await
            {
                Some(Ok(item)) => item,
                Some(Err(err)) => {
                    log::debug!("post-commit resolve failed: {err:#}");
                    done_item
                }
                None => return,
            };
            // swallow the editor's trailing text-changed event before
            // judging whether the commit survived
            tokio::time::sleep(wait).await;
            dispatcher.dispatch(move |coord| {
                coord.finish_commit(
                    generation,
                    source,
                    option,
                    resolved,
                    insert_char_at,
                    insert_leave_at,
                )
            });
        });
    }

    pub(crate) fn finish_commit(
        &mut self,
        generation: u64,
        source: Arc<dyn Source>,
        option: CompleteOption,
        item: Item,
        insert_char_at: Option<Instant>,
        insert_leave_at: Option<Instant>,
    ) {
        let live = self
            .session
            .as_ref()
            .is_some_and(|session| session.generation == generation);
        if !live {
            return;
        }
        let interrupted =
            self.insert_char_at != insert_char_at || self.insert_leave_at != insert_leave_at;
        if !interrupted && self.pretext.ends_with(&item.word) {
            self.recency.touch(option.bufnr, &item.word, epoch_ms());
            let hook = source.on_complete_done(&item, &option);
            tokio::spawn(async move {
                if let Err(err) = hook.await {
                    log::error!("post-commit hook failed: {err:#}");
                }
            });
        }
        self.stop();
    }

    // ---- session lifecycle ---------------------------------------------

    /// InsertEnter probe: read the cursor prefix and apply the trigger
    /// policy to it before asking for a full option.
    async fn probe_trigger(&mut self, bufnr: u64) {
        let pre = match self.bridge.pretext().await {
            Ok(pre) => pre,
            Err(err) => {
                log::error!("pretext query failed: {err:#}");
                return;
            }
        };
        self.pretext = pre.clone();
        let filetype = self.filetype(bufnr);
        if !self.trigger_matches(&pre, &filetype) {
            return;
        }
        match self.bridge.get_complete_option().await {
            Ok(Some(option)) => self.start_or_report(option).await,
            Ok(None) => {}
            Err(err) => log::error!("get_complete_option failed: {err:#}"),
        }
    }

    async fn trigger_completion(&mut self) {
        if self.session.is_none() {
            // a popup we do not own is up, leave it alone
            match self.bridge.pum_visible().await {
                Ok(false) => {}
                Ok(true) => return,
                Err(err) => {
                    log::error!("pum_visible failed: {err:#}");
                    return;
                }
            }
        }
        match self.bridge.get_complete_option().await {
            Ok(Some(option)) => self.start_or_report(option).await,
            Ok(None) => {}
            Err(err) => log::error!("get_complete_option failed: {err:#}"),
        }
    }

    async fn start_or_report(&mut self, option: CompleteOption) {
        if let Err(err) = self.start_completion(option).await {
            log::error!("completion failed to start: {err}");
            self.stop();
            let _ = self
                .bridge
                .notify(vec![EditorCommand::EchoError(format!("Complete error: {err}"))]);
        }
    }

    async fn start_completion(&mut self, option: CompleteOption) -> Result<()> {
        if option.is_command_line() {
            return Ok(());
        }
        let config = self.config.load_full();
        let mut selected: Vec<Arc<dyn Source>> = match &option.source {
            Some(name) => match self.sources.iter().find(|s| s.name() == name.as_str()) {
                Some(source) => vec![source.clone()],
                None => return Err(Error::Misuse("unknown completion source requested")),
            },
            None => self
                .sources
                .iter()
                .filter(|source| source.should_complete(&option))
                .cloned()
                .collect(),
        };
        selected.sort_by_key(|source| std::cmp::Reverse(source.priority()));
        if selected.is_empty() {
            return Ok(());
        }

        // dispose the previous attempt before installing the new one
        if self.session.is_some() {
            self.stop();
        }
        self.pretext = option.initial_pretext().to_string();
        self.generation += 1;
        let mut session = Session::new(self.generation, option, selected);
        if !config.keep_completeopt {
            self.bridge
                .notify(vec![EditorCommand::SetCompleteopt(completeopt(&config))])
                .map_err(Error::EditorRpc)?;
            session.pushed_completeopt = true;
        }

        let handle = session.controller.handle();
        let runs: Vec<(usize, Arc<dyn Source>)> =
            session.sources.iter().cloned().enumerate().collect();
        let generation = session.generation;
        let option = session.option.clone();
        self.session = Some(session);
        spawn_fan_out(
            self.dispatcher.clone(),
            self.recency.clone(),
            config.timeout,
            handle,
            generation,
            runs,
            option,
            None,
        );
        Ok(())
    }

    /// Record a batch of source answers delivered by the fan-out.
    /// `sync_tick` carries the change counter a re-query was issued
    /// under; answers for a document that moved on are discarded.
    pub(crate) fn record_results(
        &mut self,
        generation: u64,
        batch: Vec<(usize, Result<SourceReply>)>,
        sync_tick: Option<u64>,
    ) {
        if sync_tick.is_some_and(|tick| tick != self.changedtick) {
            return;
        }
        {
            let Some(session) = self
                .session
                .as_mut()
                .filter(|session| session.generation == generation)
            else {
                return;
            };
            for (idx, reply) in batch {
                let reply = match reply {
                    Ok(reply) => Some(reply),
                    Err(err) => {
                        log::debug!("dropping source for this session: {err}");
                        None
                    }
                };
                session.record(idx, reply);
            }
        }
        self.show_completion(generation);
    }

    /// Rank the current union against the live input and paint the popup.
    /// Stops the session when nothing matches and nothing is running.
    pub(crate) fn show_completion(&mut self, generation: u64) {
        let config = self.config.load_full();
        let tick = self.changedtick;
        let now = epoch_ms();
        let recency = self.recency.clone();

        let batch = {
            let Some(session) = self
                .session
                .as_mut()
                .filter(|session| session.generation == generation)
            else {
                return;
            };
            let candidates = filter::rank(
                &session.results,
                &session.input,
                &config,
                &recency,
                session.option.bufnr,
                now,
            );
            let priorities: Vec<i32> = session.sources.iter().map(|s| s.priority()).collect();
            let (rows, preselect) =
                popup::build_rows(candidates, &priorities, &session.option, &config);
            if rows.is_empty() {
                if session.is_completing() {
                    return;
                }
                None
            } else {
                let mut batch = Vec::new();
                if !session.number_select_mapped
                    && popup::number_select_active(&config, &session.option)
                {
                    session.number_select_mapped = true;
                    batch.push(EditorCommand::MapNumberSelect);
                }
                batch.push(EditorCommand::PopupShow {
                    col: session.option.col + 1,
                    rows: rows.iter().map(|(_, item)| item.clone()).collect(),
                    preselect,
                });
                session.changed_tick = Some(tick);
                session.shown = rows;
                Some(batch)
            }
        };

        match batch {
            None => self.stop(),
            Some(batch) => {
                if let Err(err) = self.bridge.notify(batch) {
                    log::error!("popup rpc failed: {err:#}");
                    self.stop();
                }
            }
        }
    }

    /// The pretext moved while a session is live: narrow, re-query or
    /// stop, per the resume rules.
    pub(crate) fn resume_completion(&mut self, force: bool) {
        enum Plan {
            Stop,
            Nothing,
            Refilter(u64),
            Requery {
                generation: u64,
                runs: Vec<(usize, Arc<dyn Source>)>,
                option: CompleteOption,
                handle: TaskHandle,
            },
        }

        let config = self.config.load_full();
        let plan = {
            let Some(session) = self.session.as_mut() else {
                return;
            };
            match get_resume_input(&self.pretext, &session.option) {
                None => Plan::Stop,
                Some(search) if search == session.input && !force => Plan::Nothing,
                Some(search)
                    if search.is_empty()
                        || search.chars().last().is_some_and(char_is_whitespace)
                        || !search.starts_with(&session.option.input) =>
                {
                    Plan::Stop
                }
                Some(search) => {
                    session.input = search.clone();
                    let incomplete: Vec<usize> = session
                        .results
                        .iter()
                        .enumerate()
                        .filter(|(_, result)| result.done && result.is_incomplete)
                        .map(|(idx, _)| idx)
                        .collect();
                    if incomplete.is_empty() {
                        Plan::Refilter(session.generation)
                    } else {
                        let mut option = session.option.clone();
                        option.input = search;
                        let runs = incomplete
                            .into_iter()
                            .map(|idx| {
                                session.results[idx].done = false;
                                session.pending += 1;
                                (idx, session.sources[idx].clone())
                            })
                            .collect();
                        Plan::Requery {
                            generation: session.generation,
                            runs,
                            option,
                            handle: session.controller.handle(),
                        }
                    }
                }
            }
        };

        match plan {
            Plan::Stop => self.stop(),
            Plan::Nothing => {}
            Plan::Refilter(generation) => self.show_completion(generation),
            Plan::Requery {
                generation,
                runs,
                option,
                handle,
            } => spawn_fan_out(
                self.dispatcher.clone(),
                self.recency.clone(),
                config.timeout,
                handle,
                generation,
                runs,
                option,
                Some(self.changedtick),
            ),
        }
    }

    /// Typing a delimiter over a highlighted suggestion accepts it: the
    /// line is rewritten with the word plus the delimiter and the session
    /// ends without resuming.
    fn accept_by_commit_char(&mut self, ch: char) {
        let Some(session) = &self.session else {
            return;
        };
        let Some(current) = &self.current_item else {
            return;
        };
        let option = session.option.clone();
        let word = current.item.word.clone();
        let col = option.col as usize;
        let colnr = option.colnr as usize;
        let mut text = String::new();
        text.push_str(option.line.get(..col).unwrap_or_default());
        text.push_str(&word);
        text.push(ch);
        text.push_str(option.line.get(colnr.saturating_sub(1)..).unwrap_or_default());

        self.stop();
        let batch = vec![
            EditorCommand::SetLine {
                lnum: option.linenr,
                text,
            },
            EditorCommand::MoveCursor {
                lnum: option.linenr,
                col: option.col + word.len() as u32 + 2,
            },
        ];
        if let Err(err) = self.bridge.notify(batch) {
            log::error!("commit rpc failed: {err:#}");
        }
    }

    /// Render resolved documentation, unless the session moved on while
    /// the resolve was in flight.
    pub(crate) fn show_docs(&mut self, request: ResolveRequest, resolved: Item, handle: TaskHandle) {
        if handle.is_canceled() {
            return;
        }
        let live = self
            .session
            .as_ref()
            .is_some_and(|session| session.generation == request.generation);
        if !live {
            self.floating.close();
            return;
        }
        let docs = docs_for(&resolved, &request.filetype);
        if docs.is_empty() {
            self.floating.close();
            return;
        }
        if let Err(err) = self.floating.show(docs, request.bounds, handle) {
            log::error!("floating window failed: {err:#}");
        }
    }

    /// Tear down the active session. Idempotent; a no-op while idle.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.current_item = None;
        send_blocking(&self.resolver, ResolveEvent::Cancel);
        self.floating.close();
        session.controller.cancel();

        let mut batch = vec![
            EditorCommand::PopupHide,
            EditorCommand::SetCandidates(Vec::new()),
        ];
        if session.number_select_mapped {
            batch.push(EditorCommand::UnmapNumberSelect);
        }
        if session.pushed_completeopt {
            batch.push(EditorCommand::RestoreCompleteopt);
        }
        if let Err(err) = self.bridge.notify(batch) {
            log::error!("stop rpc failed: {err:#}");
        }
    }
}

fn leading_whitespace(text: &str) -> &str {
    &text[..text.len() - text.trim_start().len()]
}

fn row_matches(row: &Item, selected: &Item) -> bool {
    if selected.user_data.is_some() {
        row.word == selected.word && row.user_data == selected.user_data
    } else {
        row.word == selected.word && row.abbr == selected.abbr
    }
}
