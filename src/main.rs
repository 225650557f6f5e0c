use connect_four_engine::config::{AppConfig, CONFIG_FILE};
use connect_four_engine::display;
use connect_four_engine::game::save::list_saves;
use connect_four_engine::game::{
    ClickOutcome, DirStore, GameStore, IgnoreReason, OnlineLink, PlayerNames, Session, TimerQueue,
};
use connect_four_engine::network::server::start_server;
use connect_four_engine::network::RoomClient;
use connect_four_engine::player::ai::{AiMode, MAX_DEPTH, MIN_DEPTH};
use connect_four_engine::ui;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::{execute, terminal};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "connect4.log";
const IDLE: Duration = Duration::from_millis(100);

fn init_tracing(to_file: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if to_file {
        // The terminal belongs to the board while the TUI runs.
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(LOG_FILE)?;
        builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        builder.with_writer(io::stderr).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_or_default(Path::new(CONFIG_FILE))?;

    if std::env::args().any(|a| a == "--server") {
        init_tracing(false)?;
        return start_server(&config.network.addr).await;
    }
    init_tracing(true)?;

    terminal::enable_raw_mode()?;
    execute!(io::stdout(), terminal::EnterAlternateScreen)?;

    let res = run(config).await;

    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;

    if let Err(e) = &res {
        tracing::error!("exiting with error: {e:#}");
    }
    res
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    execute!(
        io::stdout(),
        terminal::Clear(terminal::ClearType::All),
        crossterm::cursor::MoveTo(0, 0)
    )?;
    print!("=== Connect Four ===\r\n");
    print!("\r\nSelect mode:\r\n");
    print!("1. Local Play\r\n");
    print!("2. Start Server ({})\r\n", config.network.addr);
    print!("3. Connect to Server\r\n");

    match ui::choose(&['1', '2', '3'])? {
        Some('1') => play(&config, None).await,
        Some('2') => run_server(&config).await,
        Some('3') => run_client(&config).await,
        _ => Ok(()),
    }
}

async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    print!("\r\nServing rooms on {}. Press q to stop.\r\n", config.network.addr);
    let quit = tokio::task::spawn_blocking(|| ui::choose(&[]));
    tokio::select! {
        res = start_server(&config.network.addr) => res,
        _ = quit => Ok(()),
    }
}

async fn run_client(config: &AppConfig) -> anyhow::Result<()> {
    let Some(addr) = ui::read_input_raw(&config.network.addr, "Server address")? else {
        return Ok(());
    };
    let Some(name) = ui::read_input_raw("Player", "Your name")? else {
        return Ok(());
    };
    let mut client = RoomClient::connect(&addr).await?;

    print!("c. Create a room\r\nj. Join a room\r\n");
    let info = match ui::choose(&['c', 'j'])? {
        Some('c') => {
            let board = &config.board;
            client
                .create(board.rows, board.cols, board.starting_player, &name)
                .await?
        }
        Some('j') => {
            let Some(code) = ui::read_input_raw("", "Room code")? else {
                return Ok(());
            };
            client.join(&code, &name).await?
        }
        _ => return Ok(()),
    };
    tracing::info!("room {} as {}", info.code, info.role);
    play(config, Some((client, OnlineLink::from(info)))).await
}

enum Flow {
    Continue,
    Quit,
}

struct App {
    session: Session<TimerQueue>,
    store: DirStore,
    client: Option<RoomClient>,
    message: Option<String>,
    next_poll: Instant,
    poll_every: Duration,
    save_dir: std::path::PathBuf,
}

async fn play(config: &AppConfig, online: Option<(RoomClient, OnlineLink)>) -> anyhow::Result<()> {
    let mut app = App {
        session: Session::new(config, TimerQueue::new()),
        store: DirStore::new(&config.store_dir),
        client: None,
        message: None,
        next_poll: Instant::now(),
        poll_every: config.timing.poll(),
        save_dir: config.save_dir.clone(),
    };
    if let Some((client, link)) = online {
        app.message = Some(format!("room code {}", link.code));
        app.session.enter_online(link);
        app.client = Some(client);
    }

    let mut dirty = true;
    loop {
        let now = Instant::now();
        if app.session.run_due(now) > 0 {
            dirty = true;
        }
        if app.client.is_some() && now >= app.next_poll {
            app.poll_remote().await;
            app.next_poll = now + app.poll_every.max(IDLE);
            dirty = true;
        }
        if dirty {
            display::render(
                &app.session.render_view(),
                app.session.history(),
                app.message.as_deref(),
            )?;
            dirty = false;
        }

        let wait = app
            .session
            .next_due_in(Instant::now())
            .map_or(IDLE, |d| d.min(IDLE));
        if !event::poll(wait)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind == KeyEventKind::Release {
            continue;
        }
        dirty = true;
        if let Flow::Quit = app.handle_key(key.code).await? {
            return Ok(());
        }
    }
}

impl App {
    async fn poll_remote(&mut self) {
        let (Some(client), Some(link)) = (self.client.as_mut(), self.session.online_link()) else {
            return;
        };
        let code = link.code.clone();
        match client.state(&code).await {
            Ok(state) => {
                if let Err(e) = self.session.apply_remote_state(&state) {
                    self.message = Some(e.to_string());
                }
            }
            Err(e) => {
                tracing::warn!("polling room {code} failed: {e:#}");
                self.message = Some(format!("connection problem: {e}"));
            }
        }
    }

    async fn submit_remote(&mut self, column: usize) {
        let (Some(client), Some(link)) = (self.client.as_mut(), self.session.online_link()) else {
            return;
        };
        let (code, secret) = (link.code.clone(), link.secret.clone());
        match client.submit_move(&code, &secret, column).await {
            Ok(_) => self.message = None,
            Err(e) => self.message = Some(e.to_string()),
        }
        self.next_poll = Instant::now();
    }

    async fn click(&mut self, column: usize) {
        self.message = match self.session.click(column) {
            ClickOutcome::Played { .. } => None,
            ClickOutcome::Rejected(e) => Some(e.to_string()),
            ClickOutcome::Ignored(reason) => Some(
                match reason {
                    IgnoreReason::GameOver => "the game is over",
                    IgnoreReason::Busy => "the machine is moving",
                    IgnoreReason::Replay => "rewound: press r to resume here or End to return",
                    IgnoreReason::NotYourTurn => "not your turn",
                    IgnoreReason::Spectator => "spectators cannot play",
                }
                .to_string(),
            ),
            ClickOutcome::SubmitRemote(col) => {
                self.submit_remote(col).await;
                return;
            }
        };
    }

    fn move_hover(&mut self, delta: isize) {
        let cols = self.session.grid().cols();
        let next = match self.session.hovered() {
            Some(c) => c.saturating_add_signed(delta).min(cols - 1),
            None => cols / 2,
        };
        self.session.hover(Some(next));
    }

    fn note<T, E: std::fmt::Display>(&mut self, res: Result<T, E>, ok: impl FnOnce(T) -> String) {
        self.message = Some(match res {
            Ok(v) => ok(v),
            Err(e) => e.to_string(),
        });
    }

    async fn handle_key(&mut self, code: KeyCode) -> anyhow::Result<Flow> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Flow::Quit),
            KeyCode::Char(c @ '1'..='9') => {
                let col = c as usize - '1' as usize;
                self.session.hover(Some(col));
                self.click(col).await;
            }
            KeyCode::Left => self.move_hover(-1),
            KeyCode::Right => self.move_hover(1),
            KeyCode::Enter | KeyCode::Down | KeyCode::Char(' ') => {
                if let Some(col) = self.session.hovered() {
                    self.click(col).await;
                }
            }
            KeyCode::Char('m') => {
                let mode = self.session.mode().next();
                self.session.set_mode(mode);
            }
            KeyCode::Char('a') => {
                let ai = self.session.ai();
                let mode = match ai.mode {
                    AiMode::Random => AiMode::Minimax,
                    AiMode::Minimax => AiMode::Random,
                };
                let depth = ai.depth;
                self.session.set_ai(mode, depth);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let ai = self.session.ai();
                let (mode, depth) = (ai.mode, (ai.depth + 1).min(MAX_DEPTH));
                self.session.set_ai(mode, depth);
            }
            KeyCode::Char('-') => {
                let ai = self.session.ai();
                let (mode, depth) = (ai.mode, ai.depth.saturating_sub(1).max(MIN_DEPTH));
                self.session.set_ai(mode, depth);
            }
            KeyCode::Char('n') => {
                // A new game always ends the room session.
                self.client = None;
                self.session.new_game();
                self.message = None;
            }
            KeyCode::Char('x') => self.session.stop(),
            KeyCode::Char('[') => {
                self.session.prev();
            }
            KeyCode::Char(']') => {
                self.session.next();
            }
            KeyCode::Home => {
                self.session.first();
            }
            KeyCode::End => {
                self.session.last();
            }
            KeyCode::Char('r') => {
                if !self.session.resume_here() {
                    self.message = Some("nothing to resume".to_string());
                }
            }
            KeyCode::Char('p') => self.prompt_names()?,
            KeyCode::Char('b') => self.prompt_board()?,
            KeyCode::Char('s') => {
                let res = self.session.save_to_dir(&self.save_dir);
                self.note(res, |p| format!("saved to {}", p.display()));
            }
            KeyCode::Char('l') => {
                let files = list_saves(&self.save_dir);
                let labels: Vec<String> = files
                    .iter()
                    .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                    .collect();
                if let Some(i) = ui::select_from_list("Load saved game", &labels)? {
                    let res = self.session.load_file(&files[i]);
                    self.note(res, |_| format!("loaded {}", labels[i]));
                }
            }
            KeyCode::Char('S') => {
                let res = self.session.save_to_store(&mut self.store);
                self.note(res, |id| format!("stored as {id}"));
            }
            KeyCode::Char('L') => {
                let entries = match self.store.list() {
                    Ok(entries) => entries,
                    Err(e) => {
                        self.message = Some(e.to_string());
                        return Ok(Flow::Continue);
                    }
                };
                let labels: Vec<String> = entries
                    .iter()
                    .map(|e| {
                        let s = &e.game.summary;
                        format!(
                            "{}  {}  {:?} {} moves, winner {:?}",
                            e.id,
                            e.game.payload.save_name.as_deref().unwrap_or("-"),
                            s.status,
                            s.total_moves,
                            s.winner
                        )
                    })
                    .collect();
                if let Some(i) = ui::select_from_list("Load stored game", &labels)? {
                    let res = self.session.load_from_store(&self.store, &entries[i].id);
                    self.note(res, |_| format!("loaded {}", entries[i].id));
                }
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn prompt_names(&mut self) -> anyhow::Result<()> {
        print!("\r\n");
        let Some(a) = ui::read_input_raw("", "Name for A (empty: default)")? else {
            return Ok(());
        };
        let Some(b) = ui::read_input_raw("", "Name for B (empty: default)")? else {
            return Ok(());
        };
        let keep = |s: String| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        self.session.set_names(PlayerNames {
            a: keep(a),
            b: keep(b),
        });
        Ok(())
    }

    fn prompt_board(&mut self) -> anyhow::Result<()> {
        let grid = self.session.grid();
        let (rows, cols) = (grid.rows().to_string(), grid.cols().to_string());
        print!("\r\n");
        let Some(rows) = ui::read_input_raw(&rows, "Rows")? else {
            return Ok(());
        };
        let Some(cols) = ui::read_input_raw(&cols, "Columns")? else {
            return Ok(());
        };
        let (Ok(rows), Ok(cols)) = (rows.trim().parse(), cols.trim().parse()) else {
            self.message = Some("rows and columns must be numbers".to_string());
            return Ok(());
        };
        let starting = self.session.log().starting_player();
        match self.session.set_board(rows, cols, starting) {
            Ok(()) => {
                self.client = None;
                self.session.new_game();
                self.message = Some(format!("new {rows}x{cols} board"));
            }
            Err(e) => self.message = Some(e.to_string()),
        }
        Ok(())
    }
}
