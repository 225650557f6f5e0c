use crate::core::{Cell, Player, Position};
use crate::game::{EventLog, RenderView, Status};
use crate::player::ai::ColumnScore;
use crossterm::{cursor, execute, style::Stylize, terminal};
use std::io::{self, stdout, Write};

/// History lines shown under the board.
const HISTORY_LINES: usize = 8;
const CELL_WIDTH: usize = 4;

fn glyph(cell: Cell) -> char {
    match cell {
        Cell::Empty => '.',
        Cell::Token(Player::A) => 'O',
        Cell::Token(Player::B) => 'X',
    }
}

/// Column labels, 1-based, one cell wide each.
pub fn column_header(cols: usize) -> String {
    (1..=cols).map(|c| format!("{c:^CELL_WIDTH$}")).collect()
}

/// Per-column score row; empty columns of the report show as blanks.
pub fn score_row(scores: &[ColumnScore], cols: usize) -> String {
    (0..cols)
        .map(|c| match scores.get(c) {
            Some(ColumnScore::Scored(v)) => {
                let text = compact(*v);
                format!("{text:^CELL_WIDTH$}")
            }
            Some(other) => format!("{:^CELL_WIDTH$}", other.to_string()),
            None => " ".repeat(CELL_WIDTH),
        })
        .collect()
}

/// Squeezes a score into a cell: 1234567 -> "1M", -25000 -> "-25k".
fn compact(v: i64) -> String {
    let abs = v.unsigned_abs();
    let sign = if v < 0 { "-" } else { "" };
    if abs >= 1_000_000 {
        format!("{sign}{}M", abs / 1_000_000)
    } else if abs >= 10_000 {
        format!("{sign}{}k", abs / 1_000)
    } else {
        v.to_string()
    }
}

fn status_line(view: &RenderView) -> String {
    let name = |p: Player| match p {
        Player::A => view.names[0].as_str(),
        Player::B => view.names[1].as_str(),
    };
    match view.status {
        Status::ToMove(p) => format!("{} ({p}) to move", name(p)),
        Status::Thinking(p) => format!("{} ({p}) is thinking...", name(p)),
        Status::Won(p) => format!("{} ({p}) wins!", name(p)),
        ref other => other.to_string(),
    }
}

pub fn render(view: &RenderView, history: &EventLog, message: Option<&str>) -> io::Result<()> {
    let mut out = stdout();
    execute!(
        out,
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    )?;

    let online = match &view.online {
        Some((code, role)) => format!("  room {code} as {role}"),
        None => String::new(),
    };
    print!(
        "=== Connect Four === game #{}  {}  ai: {} depth {}{}\r\n",
        view.game_index,
        view.mode,
        view.ai_mode.as_str(),
        view.depth,
        online
    );
    print!("{}\r\n", status_line(view).bold().yellow());
    match message {
        Some(msg) => print!("{}\r\n", msg.cyan()),
        None => print!("\r\n"),
    }

    let cols = view.grid.cols();
    print!(" {}\r\n", column_header(cols));
    let pointer: String = (0..cols)
        .map(|c| {
            if view.hover_column == Some(c) {
                format!("{:^CELL_WIDTH$}", "v")
            } else {
                " ".repeat(CELL_WIDTH)
            }
        })
        .collect();
    print!(" {}\r\n", pointer.yellow());
    print!("+{}+\r\n", "-".repeat(cols * CELL_WIDTH));

    for row in 0..view.grid.rows() {
        print!("|");
        for col in 0..cols {
            let cell = view.grid.get(row, col);
            let text = format!("{:^CELL_WIDTH$}", glyph(cell));
            let winning = view.winning_cells.contains(&Position::new(row, col));
            match cell.owner() {
                _ if winning => print!("{}", text.black().on_green()),
                Some(Player::A) => print!("{}", text.red()),
                Some(Player::B) => print!("{}", text.yellow()),
                None if view.hover_column == Some(col) => print!("{}", text.dark_grey()),
                None => print!("{text}"),
            }
        }
        print!("|\r\n");
    }
    print!("+{}+\r\n", "-".repeat(cols * CELL_WIDTH));

    if !view.scores.is_empty() {
        print!(" {}\r\n", score_row(&view.scores, cols).magenta());
    }
    print!(
        "moves {}/{}   {} (O) vs {} (X)\r\n\r\n",
        view.cursor, view.total_moves, view.names[0], view.names[1]
    );

    for event in history.iter().take(HISTORY_LINES) {
        print!("{}\r\n", event.to_string().dark_grey());
    }
    print!(
        "\r\n{}\r\n",
        "1-9/arrows+enter: play  m: mode  a: ai  +/-: depth  n: new  x: stop  \
         [ ] home end: replay  r: resume  s/l: save/load  S/L: store  q: quit"
            .dark_grey()
    );
    out.flush()
}
